//! Where schema text comes from.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};

/// One schema document as read from a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    /// Registry name: the file stem for directory sources.
    pub name: String,
    /// Where the entry came from, for diagnostics.
    pub origin: String,
    /// Schema text, or why this entry alone could not be read.
    pub content: std::result::Result<String, RegistryError>,
}

impl SourceEntry {
    pub fn new(name: impl Into<String>, origin: impl Into<String>, content: String) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            content: Ok(content),
        }
    }

    /// An entry that exists in the source but could not be read.
    pub fn unreadable(
        name: impl Into<String>,
        origin: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            content: Err(RegistryError::Unreadable(reason.into())),
        }
    }
}

/// A collection of named schema documents that can be read repeatedly.
///
/// `entries` is called on the initial load and on every reload or watch
/// pass; it must return the current content each time. A problem with one
/// entry is reported on that entry; `Err` means the source as a whole could
/// not be listed.
pub trait SchemaSource: Send + Sync {
    /// Human-readable description used in logs.
    fn label(&self) -> &str;

    /// Read every entry, ordered by name.
    fn entries(&self, config: &RegistryConfig) -> Result<Vec<SourceEntry>>;

    /// Version label applied to schemas that do not declare one.
    fn version_label(&self) -> Option<&str> {
        None
    }

    /// Directory whose filesystem events signal a change, if any. Sources
    /// without one are polled.
    fn watch_path(&self) -> Option<&Path> {
        None
    }
}

impl<S: SchemaSource + ?Sized> SchemaSource for Arc<S> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn entries(&self, config: &RegistryConfig) -> Result<Vec<SourceEntry>> {
        (**self).entries(config)
    }

    fn version_label(&self) -> Option<&str> {
        (**self).version_label()
    }

    fn watch_path(&self) -> Option<&Path> {
        (**self).watch_path()
    }
}

/// Schemas stored as `<name>.schema.json` or `<name>.json` files in one
/// directory. Subdirectories are not searched.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
    label: String,
    version: Option<String>,
}

impl DirectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self {
            path,
            label,
            version: None,
        }
    }

    /// Apply `label` as the version of schemas that do not declare one.
    pub fn with_version_label(mut self, label: impl Into<String>) -> Self {
        self.version = Some(label.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SchemaSource for DirectorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn version_label(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn entries(&self, config: &RegistryConfig) -> Result<Vec<SourceEntry>> {
        let mut loaded = Vec::new();

        let listing = std::fs::read_dir(&self.path)
            .map_err(|err| RegistryError::LoadFailed(format!("{}: {err}", self.label)))?;

        for entry in listing {
            let entry = entry.map_err(|err| RegistryError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let Some(name) = schema_name(&file_name) else {
                continue;
            };

            let entry_path = entry.path();
            let origin = entry_path.display().to_string();
            let path_metadata = match std::fs::symlink_metadata(&entry_path) {
                Ok(metadata) => metadata,
                // Removed since the listing was taken.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    loaded.push(SourceEntry::unreadable(name, origin, err.to_string()));
                    continue;
                }
            };
            let file_type = path_metadata.file_type();
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }

            if loaded.len() >= config.max_schemas_from_directory {
                return Err(RegistryError::LoadFailed(format!(
                    "schema count exceeds configured max ({}) in {}",
                    config.max_schemas_from_directory, self.label
                )));
            }

            if file_type.is_symlink() {
                loaded.push(SourceEntry::unreadable(
                    name,
                    origin,
                    format!("refusing to load schema symlink: {file_name}"),
                ));
                continue;
            }

            let content = read_limited(&entry_path, &path_metadata, &file_name, config);
            loaded.push(SourceEntry {
                name: name.to_string(),
                origin,
                content: content.map_err(RegistryError::Unreadable),
            });
        }

        loaded.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.origin.cmp(&b.origin)));
        Ok(loaded)
    }
}

/// Registry name for a schema file, or `None` for other files.
fn schema_name(file_name: &str) -> Option<&str> {
    let stem = file_name
        .strip_suffix(".schema.json")
        .or_else(|| file_name.strip_suffix(".json"))?;
    (!stem.is_empty() && !stem.starts_with('.')).then_some(stem)
}

/// Read one schema file, or describe why it cannot be used.
fn read_limited(
    path: &Path,
    path_metadata: &std::fs::Metadata,
    file_name: &str,
    config: &RegistryConfig,
) -> std::result::Result<String, String> {
    let file = std::fs::File::open(path)
        .map_err(|err| format!("failed opening schema {}: {err}", path.display()))?;
    let opened_metadata = file
        .metadata()
        .map_err(|err| format!("failed reading metadata of {}: {err}", path.display()))?;

    #[cfg(unix)]
    {
        if !same_file_identity(path_metadata, &opened_metadata) {
            return Err(format!("schema file changed during load: {file_name}"));
        }
    }
    #[cfg(not(unix))]
    let _ = path_metadata;

    let max_bytes = config.max_schema_file_size;
    if opened_metadata.len() > max_bytes as u64 {
        return Err(format!(
            "schema file too large ({} bytes, max {max_bytes}): {file_name}",
            opened_metadata.len()
        ));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| format!("failed reading schema {}: {err}", path.display()))?;
    if content.len() > max_bytes {
        return Err(format!("schema file too large while reading: {file_name}"));
    }
    Ok(content)
}

#[cfg(unix)]
fn same_file_identity(
    path_metadata: &std::fs::Metadata,
    opened_metadata: &std::fs::Metadata,
) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}

/// Schemas held in memory, editable while a registry reads from it.
#[derive(Debug, Default)]
pub struct MemorySource {
    label: String,
    version: Option<String>,
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            version: None,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn from_entries<'a, I>(label: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let source = Self::new(label);
        for (name, content) in entries {
            source.insert(name, content);
        }
        source
    }

    pub fn with_version_label(mut self, label: impl Into<String>) -> Self {
        self.version = Some(label.into());
        self
    }

    /// Add or replace the schema text stored under `name`.
    pub fn insert(&self, name: impl Into<String>, content: impl Into<String>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), content.into());
    }

    /// Returns whether an entry was removed.
    pub fn remove(&self, name: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }
}

impl SchemaSource for MemorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn version_label(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn entries(&self, _config: &RegistryConfig) -> Result<Vec<SourceEntry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .map(|(name, content)| {
                SourceEntry::new(name, format!("{}:{name}", self.label), content.clone())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_temp_schema_dir, write_schema, OBJECT_SCHEMA};

    #[test]
    fn schema_names_come_from_file_stems() {
        assert_eq!(schema_name("user.schema.json"), Some("user"));
        assert_eq!(schema_name("user.json"), Some("user"));
        assert_eq!(schema_name("user.yaml"), None);
        assert_eq!(schema_name(".json"), None);
        assert_eq!(schema_name(".hidden.json"), None);
    }

    #[test]
    fn directory_lists_sorted_schema_files_only() {
        let dir = make_temp_schema_dir("listing");
        write_schema(&dir, "b.schema.json", OBJECT_SCHEMA);
        write_schema(&dir, "a.json", OBJECT_SCHEMA);
        write_schema(&dir, "notes.txt", "ignored");
        std::fs::create_dir_all(dir.join("nested.json")).unwrap();

        let entries = DirectorySource::new(&dir)
            .entries(&RegistryConfig::default())
            .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(entries[0].origin.ends_with("a.json"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_fails_to_load() {
        let dir = make_temp_schema_dir("missing").join("absent");
        let result = DirectorySource::new(&dir).entries(&RegistryConfig::default());
        assert!(matches!(result, Err(RegistryError::LoadFailed(_))));
    }

    #[test]
    fn schema_count_limit_is_enforced() {
        let dir = make_temp_schema_dir("count-limit");
        write_schema(&dir, "one.schema.json", OBJECT_SCHEMA);
        write_schema(&dir, "two.schema.json", OBJECT_SCHEMA);

        let config = RegistryConfig {
            max_schemas_from_directory: 1,
            ..RegistryConfig::default()
        };
        let result = DirectorySource::new(&dir).entries(&config);
        assert!(matches!(result, Err(RegistryError::LoadFailed(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn oversized_file_is_reported_on_its_own_entry() {
        let dir = make_temp_schema_dir("size-limit");
        write_schema(&dir, "big.schema.json", OBJECT_SCHEMA);
        write_schema(&dir, "small.schema.json", "true");

        let config = RegistryConfig {
            max_schema_file_size: 8,
            ..RegistryConfig::default()
        };
        let entries = DirectorySource::new(&dir).entries(&config).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(
            &entries[0].content,
            Err(RegistryError::Unreadable(reason)) if reason.contains("too large")
        ));
        assert_eq!(entries[1].content, Ok("true".to_string()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn non_utf8_file_is_reported_on_its_own_entry() {
        let dir = make_temp_schema_dir("non-utf8");
        std::fs::write(dir.join("bad.schema.json"), [b'{', 0xff, 0xfe, b'}']).unwrap();
        write_schema(&dir, "good.schema.json", OBJECT_SCHEMA);

        let entries = DirectorySource::new(&dir)
            .entries(&RegistryConfig::default())
            .unwrap();
        assert_eq!(entries[0].name, "bad");
        assert!(matches!(entries[0].content, Err(RegistryError::Unreadable(_))));
        assert_eq!(entries[1].content, Ok(OBJECT_SCHEMA.to_string()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_schema_is_refused() {
        let dir = make_temp_schema_dir("symlink");
        let target = dir.join("target.txt");
        std::fs::write(&target, OBJECT_SCHEMA.as_bytes()).unwrap();
        std::os::unix::fs::symlink(&target, dir.join("user.schema.json")).unwrap();

        let entries = DirectorySource::new(&dir)
            .entries(&RegistryConfig::default())
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(
            &entries[0].content,
            Err(RegistryError::Unreadable(reason)) if reason.contains("symlink")
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn same_file_identity_distinguishes_replaced_file() {
        let dir = make_temp_schema_dir("identity");
        let first = dir.join("first.json");
        let second = dir.join("second.json");
        std::fs::write(&first, OBJECT_SCHEMA).unwrap();
        std::fs::write(&second, OBJECT_SCHEMA).unwrap();

        let first_meta = std::fs::symlink_metadata(&first).unwrap();
        let opened_first = std::fs::File::open(&first).unwrap().metadata().unwrap();
        let opened_second = std::fs::File::open(&second).unwrap().metadata().unwrap();

        assert!(same_file_identity(&first_meta, &opened_first));
        assert!(!same_file_identity(&first_meta, &opened_second));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn memory_source_reflects_edits() {
        let source = Arc::new(MemorySource::from_entries("mem", [("b", "{}"), ("a", "true")]));
        let config = RegistryConfig::default();
        let names = |source: &Arc<MemorySource>| -> Vec<String> {
            source
                .entries(&config)
                .unwrap()
                .into_iter()
                .map(|entry| entry.name)
                .collect()
        };

        assert_eq!(names(&source), vec!["a", "b"]);
        source.insert("c", "{}");
        assert!(source.remove("a"));
        assert!(!source.remove("a"));
        assert_eq!(names(&source), vec!["b", "c"]);
        assert_eq!(source.label(), "mem");
    }
}
