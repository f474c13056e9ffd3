use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::{info, warn};

use schemagate_core::ValidationError;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::registry::Registry;
use crate::source::DirectorySource;

/// Independent registries keyed by version label.
///
/// A published version is never replaced, so the same document may be
/// valid under one version and invalid under another.
#[derive(Debug)]
pub struct VersionedRegistry {
    versions: ArcSwap<BTreeMap<String, Registry>>,
    /// Serializes `publish`; readers never take it.
    publish_lock: Mutex<()>,
    default_version: String,
}

impl VersionedRegistry {
    /// Load `base/<label>` for every label. Unreadable versions are logged
    /// and skipped; the last loaded label becomes the default.
    pub fn load<I, S>(base: &Path, versions: I, config: RegistryConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut loaded = Vec::new();
        for label in versions {
            let label = label.as_ref();
            let source = DirectorySource::new(base.join(label)).with_version_label(label);
            match Registry::load(source, config) {
                Ok(registry) => loaded.push((label.to_string(), registry)),
                Err(err) => warn!(version = label, error = %err, "skipping schema version"),
            }
        }
        Self::from_registries(loaded)
    }

    /// Assemble from already loaded registries; the last one is the default.
    pub fn from_registries<I>(registries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Registry)>,
    {
        let mut versions = BTreeMap::new();
        let mut default_version = None;
        for (label, registry) in registries {
            if versions.contains_key(&label) {
                return Err(RegistryError::VersionExists(label));
            }
            default_version = Some(label.clone());
            versions.insert(label, registry);
        }
        let default_version = default_version.ok_or(RegistryError::NoVersions)?;

        info!(
            versions = versions.len(),
            default = %default_version,
            "versioned schema registry loaded"
        );

        Ok(Self {
            versions: ArcSwap::from_pointee(versions),
            publish_lock: Mutex::new(()),
            default_version,
        })
    }

    fn current(&self) -> Arc<BTreeMap<String, Registry>> {
        self.versions.load_full()
    }

    /// Published version labels, sorted.
    pub fn versions(&self) -> Vec<String> {
        self.current().keys().cloned().collect()
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// The registry for `version`, or for the default version when `None`.
    pub fn registry(&self, version: Option<&str>) -> Result<Registry> {
        let label = version.unwrap_or(&self.default_version);
        self.current()
            .get(label)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownVersion(label.to_string()))
    }

    pub fn validate(
        &self,
        version: Option<&str>,
        name: &str,
        document: &Value,
    ) -> Result<Vec<ValidationError>> {
        self.registry(version)?.validate(name, document)
    }

    /// Add a new version. Existing versions are never replaced.
    pub fn publish(&self, version: impl Into<String>, registry: Registry) -> Result<()> {
        let version = version.into();
        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let versions = self.current();
        if versions.contains_key(&version) {
            return Err(RegistryError::VersionExists(version));
        }

        let mut next = BTreeMap::clone(&versions);
        next.insert(version.clone(), registry);
        self.versions.store(Arc::new(next));

        info!(version = %version, "schema version published");
        Ok(())
    }
}
