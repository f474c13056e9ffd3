use std::collections::BTreeMap;
use std::sync::Arc;

use schemagate_core::CompiledSchema;

use crate::error::RegistryError;

/// A schema entry that could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub name: String,
    pub origin: String,
    pub error: RegistryError,
}

/// What a load or reload pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Names of the schemas now published, sorted.
    pub loaded: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The immutable, currently published set of compiled schemas.
///
/// Replaced wholesale on reload; readers holding an `Arc<Snapshot>` keep a
/// consistent view for as long as they need it.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub(crate) generation: u64,
    pub(crate) entries: BTreeMap<String, Arc<CompiledSchema>>,
    pub(crate) by_version: BTreeMap<(String, String), Arc<CompiledSchema>>,
    pub(crate) failures: Vec<LoadFailure>,
    /// Content hash of every source entry, keyed by origin.
    pub(crate) fingerprint: BTreeMap<String, String>,
}

impl Snapshot {
    pub(crate) fn new(
        generation: u64,
        entries: BTreeMap<String, Arc<CompiledSchema>>,
        failures: Vec<LoadFailure>,
        fingerprint: BTreeMap<String, String>,
    ) -> Self {
        let by_version = entries
            .iter()
            .map(|(name, schema)| {
                (
                    (name.clone(), schema.version().to_string()),
                    Arc::clone(schema),
                )
            })
            .collect();

        Self {
            generation,
            entries,
            by_version,
            failures,
            fingerprint,
        }
    }

    /// Incremented on every publish; the initial load is generation 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CompiledSchema>> {
        self.entries.get(name)
    }

    pub fn get_version(&self, name: &str, version: &str) -> Option<&Arc<CompiledSchema>> {
        self.by_version
            .get(&(name.to_string(), version.to_string()))
    }

    /// Published names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<CompiledSchema>)> {
        self.entries.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    /// Entries of the current source that are not published in their
    /// current form.
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn report(&self) -> LoadReport {
        LoadReport {
            loaded: self.names(),
            failures: self.failures.clone(),
        }
    }
}
