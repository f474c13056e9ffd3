use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::{debug, info, warn};

use schemagate_access::DynamicDocument;
use schemagate_core::{CompiledSchema, Compiler, SchemaDefinition, ValidationError};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::snapshot::{LoadFailure, LoadReport, Snapshot};
use crate::source::{DirectorySource, MemorySource, SchemaSource, SourceEntry};

/// Result of one [`Registry::reload`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// The source content matches the published snapshot.
    Unchanged,
    /// A new snapshot was published.
    Published {
        generation: u64,
        /// Schemas recompiled and published in new form.
        changed: Vec<String>,
        /// Schemas no longer present in the source.
        removed: Vec<String>,
        /// Entries that failed; a failed schema keeps its previous form.
        failures: Vec<LoadFailure>,
    },
    /// Another caller's pass started after this request and covered it.
    Coalesced,
}

/// Named compiled schemas behind an atomically replaced snapshot.
///
/// Cloning is cheap and shares state. Queries read the current snapshot and
/// never block on a reload in progress; reloads are serialized, and requests
/// that arrive while a pass is waiting to start are folded into it.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

struct Inner {
    source: Box<dyn SchemaSource>,
    config: RegistryConfig,
    snapshot: ArcSwap<Snapshot>,
    /// Reload requests issued so far.
    requested: AtomicU64,
    /// Highest request number covered by a finished pass.
    completed: Mutex<u64>,
}

impl Registry {
    /// Read and compile every schema in `source`.
    ///
    /// Individual schema failures, unreadable files included, are collected
    /// in the snapshot; only a source that cannot be listed fails the load.
    pub fn load<S>(source: S, config: RegistryConfig) -> Result<Self>
    where
        S: SchemaSource + 'static,
    {
        let entries = source.entries(&config)?;
        let build = build(None, entries, &config, source.version_label());
        let snapshot = Snapshot::new(1, build.entries, build.failures, build.fingerprint);

        info!(
            source = source.label(),
            loaded = snapshot.len(),
            failures = snapshot.failures().len(),
            "schema registry loaded"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                source: Box::new(source),
                config,
                snapshot: ArcSwap::from_pointee(snapshot),
                requested: AtomicU64::new(0),
                completed: Mutex::new(0),
            }),
        })
    }

    /// Load schemas from a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load schemas from a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        Self::load(DirectorySource::new(path), config)
    }

    /// Load from embedded `(name, schema JSON)` pairs.
    pub fn from_embedded(schemas: &[(&str, &str)]) -> Result<Self> {
        let source = MemorySource::from_entries("embedded", schemas.iter().copied());
        Self::load(source, RegistryConfig::default())
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    pub fn source_label(&self) -> &str {
        self.inner.source.label()
    }

    pub(crate) fn watch_path(&self) -> Option<&Path> {
        self.inner.source.watch_path()
    }

    /// Loaded names and failures of the current snapshot.
    pub fn report(&self) -> LoadReport {
        self.snapshot().report()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CompiledSchema>> {
        self.snapshot().get(name).cloned()
    }

    pub fn get_version(&self, name: &str, version: &str) -> Option<Arc<CompiledSchema>> {
        self.snapshot().get_version(name, version).cloned()
    }

    fn require(&self, name: &str) -> Result<Arc<CompiledSchema>> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownSchema(name.to_string()))
    }

    /// Validate `document` against the current form of schema `name`.
    pub fn validate(&self, name: &str, document: &Value) -> Result<Vec<ValidationError>> {
        Ok(self.require(name)?.validate(document))
    }

    pub fn is_valid(&self, name: &str, document: &Value) -> Result<bool> {
        Ok(self.require(name)?.is_valid(document))
    }

    /// Published names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().names()
    }

    /// Top-level declared property names of schema `name`.
    pub fn properties(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.require(name)?.properties().to_vec())
    }

    /// Example documents declared by schema `name`.
    pub fn examples(&self, name: &str) -> Result<Vec<Value>> {
        Ok(self.require(name)?.examples().to_vec())
    }

    /// Validate `value` against schema `name` and bind it for typed access.
    pub fn bind(&self, name: &str, value: Value) -> Result<DynamicDocument> {
        let schema = self.require(name)?;
        let mut document = DynamicDocument::new(value);
        document
            .validate(&schema)
            .map_err(|violations| RegistryError::Validation {
                name: name.to_string(),
                violations,
            })?;
        Ok(document)
    }

    /// Whether the source content differs from the published snapshot.
    pub fn is_stale(&self) -> Result<bool> {
        let entries = self.inner.source.entries(&self.inner.config)?;
        Ok(fingerprint(&entries) != self.snapshot().fingerprint)
    }

    /// Re-read the source and publish a new snapshot if anything changed.
    ///
    /// Only changed schemas and the schemas that reference them are
    /// recompiled. Readers keep the old snapshot until the new one is
    /// stored with a single pointer swap.
    pub fn reload(&self) -> Result<ReloadOutcome> {
        let ticket = self.inner.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let mut completed = self
            .inner
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *completed >= ticket {
            debug!(ticket, "reload request coalesced");
            return Ok(ReloadOutcome::Coalesced);
        }

        // Requests issued before the source is read are satisfied by this pass.
        let covered = self.inner.requested.load(Ordering::SeqCst);
        let outcome = self.reload_pass()?;
        *completed = covered;
        Ok(outcome)
    }

    fn reload_pass(&self) -> Result<ReloadOutcome> {
        let previous = self.snapshot();
        let entries = self.inner.source.entries(&self.inner.config)?;
        if fingerprint(&entries) == previous.fingerprint {
            return Ok(ReloadOutcome::Unchanged);
        }

        let build = build(
            Some(previous.as_ref()),
            entries,
            &self.inner.config,
            self.inner.source.version_label(),
        );
        let generation = previous.generation() + 1;
        let failures = build.failures.clone();
        let snapshot = Snapshot::new(generation, build.entries, build.failures, build.fingerprint);

        self.inner.snapshot.store(Arc::new(snapshot));

        info!(
            source = self.inner.source.label(),
            generation,
            changed = build.changed.len(),
            removed = build.removed.len(),
            failures = failures.len(),
            "schema snapshot published"
        );

        Ok(ReloadOutcome::Published {
            generation,
            changed: build.changed,
            removed: build.removed,
            failures,
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("Registry")
            .field("source", &self.inner.source.label())
            .field("generation", &snapshot.generation())
            .field("schemas", &snapshot.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

fn fingerprint(entries: &[SourceEntry]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|entry| {
            let digest = match &entry.content {
                Ok(content) => schemagate_core::content_hash(content.as_bytes()),
                Err(err) => format!("unreadable: {err}"),
            };
            (entry.origin.clone(), digest)
        })
        .collect()
}

struct Build {
    entries: BTreeMap<String, Arc<CompiledSchema>>,
    failures: Vec<LoadFailure>,
    fingerprint: BTreeMap<String, String>,
    changed: Vec<String>,
    removed: Vec<String>,
}

/// Compile `source_entries` into the contents of a new snapshot.
///
/// With a `previous` snapshot, entries whose content and dependencies are
/// unchanged reuse their compiled form, and a failed recompile keeps the
/// previous form. A schema that references one failing in the same pass
/// fails as well, so no published schema is built from rejected content.
fn build(
    previous: Option<&Snapshot>,
    source_entries: Vec<SourceEntry>,
    config: &RegistryConfig,
    version_label: Option<&str>,
) -> Build {
    let fingerprint = fingerprint(&source_entries);
    let mut failures = Vec::new();
    let mut present = BTreeSet::new();
    let mut definitions: BTreeMap<String, Arc<SchemaDefinition>> = BTreeMap::new();
    let mut ids = HashSet::new();

    for entry in source_entries {
        let SourceEntry {
            name,
            origin,
            content,
        } = entry;

        if !present.insert(name.clone()) {
            failures.push(failure(
                name.clone(),
                origin,
                RegistryError::DuplicateSchema(name),
            ));
            continue;
        }

        let content = match content {
            Ok(content) => content,
            Err(error) => {
                failures.push(failure(name, origin, error));
                continue;
            }
        };

        let definition = match SchemaDefinition::from_json(&name, &content) {
            Ok(definition) => definition.with_origin(origin.clone()),
            Err(source) => {
                failures.push(failure(
                    name.clone(),
                    origin,
                    RegistryError::Compile { name, source },
                ));
                continue;
            }
        };
        let definition = match version_label {
            Some(label) => definition.with_default_version(label),
            None => definition,
        };

        if !ids.insert(definition.id().to_string()) {
            let id = definition.id().to_string();
            failures.push(failure(name, origin, RegistryError::DuplicateSchema(id)));
            continue;
        }
        definitions.insert(name, Arc::new(definition));
    }

    let previous_schema = |name: &str| previous.and_then(|snapshot| snapshot.get(name));

    let removed: Vec<String> = previous
        .map(|snapshot| {
            snapshot
                .entries
                .keys()
                .filter(|name| !present.contains(*name))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    // Changed content, new names, and names that failed before.
    let mut dirty: BTreeSet<String> = definitions
        .iter()
        .filter(|(name, definition)| {
            previous_schema(name).map(|schema| schema.content_hash())
                != Some(definition.content_hash())
        })
        .map(|(name, _)| name.clone())
        .collect();

    let mut changed_ids: HashSet<String> = dirty
        .iter()
        .chain(&removed)
        .chain(present.iter().filter(|name| !definitions.contains_key(*name)))
        .filter_map(|name| previous_schema(name).map(|schema| schema.id().to_string()))
        .chain(dirty.iter().map(|name| definitions[name].id().to_string()))
        .collect();

    // Schemas that reference a changed schema are recompiled so their
    // linked nodes point at the new form.
    loop {
        let dependents: Vec<&String> = definitions
            .keys()
            .filter(|name| !dirty.contains(*name))
            .filter(|name| {
                previous_schema(name).is_some_and(|schema| {
                    schema
                        .dependencies()
                        .iter()
                        .any(|id| changed_ids.contains(id))
                })
            })
            .collect();
        if dependents.is_empty() {
            break;
        }
        for name in dependents {
            changed_ids.insert(definitions[name].id().to_string());
            dirty.insert(name.clone());
        }
    }

    let compiler = Compiler::new(config.compile_options())
        .with_definitions(definitions.values().cloned());
    let mut entries = BTreeMap::new();
    let mut compiled = BTreeMap::new();
    // Id of every schema that failed this pass, mapped to its name.
    let mut failed_ids: BTreeMap<String, String> = BTreeMap::new();

    for (name, definition) in &definitions {
        if !dirty.contains(name) {
            if let Some(schema) = previous_schema(name) {
                entries.insert(name.clone(), Arc::clone(schema));
            }
            continue;
        }

        match compile_entry(&compiler, definition, config) {
            Ok(schema) => {
                compiled.insert(name.clone(), schema);
            }
            Err(source) => {
                let error = RegistryError::Compile {
                    name: name.clone(),
                    source,
                };
                failures.push(failure(name.clone(), definition.origin().to_string(), error));
                failed_ids.insert(definition.id().to_string(), name.clone());
                if let Some(schema) = previous_schema(name) {
                    entries.insert(name.clone(), Arc::clone(schema));
                }
            }
        }
    }

    // Dependents were compiled against the new text of their targets;
    // discard them transitively when a target did not make it.
    loop {
        let tainted: Vec<(String, String)> = compiled
            .iter()
            .filter_map(|(name, schema)| {
                schema
                    .dependencies()
                    .iter()
                    .find_map(|id| failed_ids.get(id))
                    .map(|dependency| (name.clone(), dependency.clone()))
            })
            .collect();
        if tainted.is_empty() {
            break;
        }

        for (name, dependency) in tainted {
            if let Some(schema) = compiled.remove(&name) {
                failed_ids.insert(schema.id().to_string(), name.clone());
            }
            let error = RegistryError::DependencyFailed {
                name: name.clone(),
                dependency,
            };
            let origin = definitions[&name].origin().to_string();
            failures.push(failure(name.clone(), origin, error));
            if let Some(schema) = previous_schema(&name) {
                entries.insert(name, Arc::clone(schema));
            }
        }
    }

    let mut changed = Vec::new();
    for (name, schema) in compiled {
        debug!(schema = %name, version = schema.version(), "schema compiled");
        entries.insert(name.clone(), Arc::new(schema));
        changed.push(name);
    }

    // Unparseable entries keep their previous form too.
    for name in present.iter().filter(|name| !definitions.contains_key(*name)) {
        if let Some(schema) = previous_schema(name) {
            entries.insert(name.clone(), Arc::clone(schema));
        }
    }

    for failure in &failures {
        warn!(
            schema = %failure.name,
            origin = %failure.origin,
            error = %failure.error,
            "schema not loaded"
        );
    }

    Build {
        entries,
        failures,
        fingerprint,
        changed,
        removed,
    }
}

fn compile_entry(
    compiler: &Compiler,
    definition: &SchemaDefinition,
    config: &RegistryConfig,
) -> schemagate_core::Result<CompiledSchema> {
    let schema = compiler.compile(definition)?;
    if config.verify_examples {
        schema.verify_examples()?;
    }
    Ok(schema)
}

fn failure(name: String, origin: String, error: RegistryError) -> LoadFailure {
    LoadFailure {
        name,
        origin,
        error,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::{make_temp_schema_dir, write_schema, OBJECT_SCHEMA};
    use schemagate_access::DocumentAccess;
    use schemagate_core::{CompileError, ValidationErrorKind};

    fn memory(entries: &[(&str, &str)]) -> (Arc<MemorySource>, Registry) {
        let source = Arc::new(MemorySource::from_entries("test", entries.iter().copied()));
        let registry = Registry::load(Arc::clone(&source), RegistryConfig::default()).unwrap();
        (source, registry)
    }

    #[test]
    fn load_and_query() {
        let registry = Registry::from_embedded(&[
            ("item", OBJECT_SCHEMA),
            ("flags", r#"{"type":"array","items":{"type":"boolean"}}"#),
        ])
        .unwrap();

        assert_eq!(registry.names(), vec!["flags", "item"]);
        assert_eq!(registry.generation(), 1);
        assert_eq!(registry.properties("item").unwrap(), vec!["id", "name"]);
        assert!(registry.is_valid("item", &json!({ "id": 1, "name": "ok" })).unwrap());
        assert!(!registry.is_valid("flags", &json!([true, 1])).unwrap());
        assert_eq!(
            registry.validate("missing", &json!({})),
            Err(RegistryError::UnknownSchema("missing".to_string()))
        );
        assert!(registry.get_version("item", "unversioned").is_some());
        assert!(registry.get_version("item", "v9").is_none());
    }

    #[test]
    fn one_broken_schema_does_not_abort_the_others() {
        let (_, registry) = memory(&[
            ("good", OBJECT_SCHEMA),
            ("typo", r#"{"type":"object","propertys":{}}"#),
            ("garbage", "{not json"),
        ]);

        let report = registry.report();
        assert_eq!(report.loaded, vec!["good"]);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().any(|failure| matches!(
            &failure.error,
            RegistryError::Compile {
                source: CompileError::UnsupportedKeyword { name, .. },
                ..
            } if name == "propertys"
        )));
        assert!(report.failures.iter().any(|failure| matches!(
            &failure.error,
            RegistryError::Compile {
                source: CompileError::InvalidJson(_),
                ..
            }
        )));
    }

    #[test]
    fn rejected_examples_fail_the_schema_unless_disabled() {
        let schema = r#"{"type":"integer","examples":[1,"two"]}"#;
        let (_, registry) = memory(&[("count", schema)]);
        assert!(registry.get("count").is_none());
        assert!(matches!(
            &registry.report().failures[0].error,
            RegistryError::Compile {
                source: CompileError::ExampleRejected { index: 1, .. },
                ..
            }
        ));

        let lenient = Registry::load(
            MemorySource::from_entries("test", [("count", schema)]),
            RegistryConfig {
                verify_examples: false,
                ..RegistryConfig::default()
            },
        )
        .unwrap();
        assert!(lenient.get("count").is_some());
    }

    #[test]
    fn duplicate_ids_keep_the_first_entry() {
        let (_, registry) = memory(&[
            ("a", r#"{"$id":"shared","type":"string"}"#),
            ("b", r#"{"$id":"shared","type":"integer"}"#),
        ]);
        assert_eq!(registry.names(), vec!["a"]);
        assert_eq!(
            registry.report().failures[0].error,
            RegistryError::DuplicateSchema("shared".to_string())
        );
    }

    #[test]
    fn strict_mode_rejects_undeclared_properties() {
        let strict = Registry::load(
            MemorySource::from_entries("test", [("item", OBJECT_SCHEMA)]),
            RegistryConfig {
                strict_mode: true,
                ..RegistryConfig::default()
            },
        )
        .unwrap();
        let (_, permissive) = memory(&[("item", OBJECT_SCHEMA)]);

        let document = json!({ "id": 1, "name": "ok", "extra": true });
        assert!(permissive.is_valid("item", &document).unwrap());
        let violations = strict.validate("item", &document).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].kind,
            ValidationErrorKind::AdditionalPropertyNotAllowed
        );
    }

    #[test]
    fn bind_validates_and_enables_typed_access() {
        let (_, registry) = memory(&[("item", OBJECT_SCHEMA)]);

        let document = registry
            .bind("item", json!({ "id": 3, "name": "widget" }))
            .unwrap();
        assert!(document.is_validated());
        assert_eq!(document.get_integer("id"), Some(3));

        match registry.bind("item", json!({ "id": 3 })) {
            Err(RegistryError::Validation { name, violations }) => {
                assert_eq!(name, "item");
                assert_eq!(violations[0].kind, ValidationErrorKind::MissingRequired);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn reload_publishes_only_on_change() {
        let (source, registry) = memory(&[("item", OBJECT_SCHEMA), ("other", "true")]);
        let before = registry.get("other").unwrap();

        assert_eq!(registry.reload().unwrap(), ReloadOutcome::Unchanged);
        assert!(!registry.is_stale().unwrap());

        source.insert("item", r#"{"type":"string"}"#);
        assert!(registry.is_stale().unwrap());
        match registry.reload().unwrap() {
            ReloadOutcome::Published {
                generation,
                changed,
                removed,
                failures,
            } => {
                assert_eq!(generation, 2);
                assert_eq!(changed, vec!["item"]);
                assert!(removed.is_empty());
                assert!(failures.is_empty());
            }
            other => panic!("expected publish, got {other:?}"),
        }

        assert!(registry.is_valid("item", &json!("now a string")).unwrap());
        assert!(Arc::ptr_eq(&before, &registry.get("other").unwrap()));
    }

    #[test]
    fn failed_recompile_keeps_previous_schema() {
        let (source, registry) = memory(&[("item", OBJECT_SCHEMA)]);
        let before = registry.get("item").unwrap();

        source.insert("item", r#"{"type":"object","minLenght":1}"#);
        match registry.reload().unwrap() {
            ReloadOutcome::Published {
                changed, failures, ..
            } => {
                assert!(changed.is_empty());
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected publish, got {other:?}"),
        }

        let after = registry.get("item").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(registry.report().failures.len(), 1);
    }

    #[test]
    fn removed_entries_are_dropped() {
        let (source, registry) = memory(&[("a", "true"), ("b", "true")]);
        source.remove("a");

        match registry.reload().unwrap() {
            ReloadOutcome::Published { removed, .. } => assert_eq!(removed, vec!["a"]),
            other => panic!("expected publish, got {other:?}"),
        }
        assert_eq!(registry.names(), vec!["b"]);
    }

    #[test]
    fn dependents_are_recompiled_when_a_target_changes() {
        let (source, registry) = memory(&[
            (
                "address",
                r#"{"type":"object","properties":{"city":{"type":"string"}}}"#,
            ),
            (
                "person",
                r#"{"type":"object","properties":{"home":{"$ref":"address.json"}}}"#,
            ),
            ("unrelated", "true"),
        ]);
        let document = json!({ "home": { "city": 12 } });
        assert!(!registry.is_valid("person", &document).unwrap());

        source.insert(
            "address",
            r#"{"type":"object","properties":{"city":{"type":["string","integer"]}}}"#,
        );
        match registry.reload().unwrap() {
            ReloadOutcome::Published { changed, .. } => {
                assert_eq!(changed, vec!["address", "person"]);
            }
            other => panic!("expected publish, got {other:?}"),
        }
        assert!(registry.is_valid("person", &document).unwrap());
    }

    #[test]
    fn previously_failing_schema_loads_once_its_target_appears() {
        let (source, registry) = memory(&[(
            "person",
            r#"{"properties":{"home":{"$ref":"address.json"}}}"#,
        )]);
        assert!(registry.get("person").is_none());
        assert!(matches!(
            &registry.report().failures[0].error,
            RegistryError::Compile {
                source: CompileError::SchemaNotFound { .. },
                ..
            }
        ));

        source.insert("address", r#"{"type":"object"}"#);
        registry.reload().unwrap();
        assert_eq!(registry.names(), vec!["address", "person"]);
        assert!(registry.report().is_clean());
    }

    #[test]
    fn failed_target_keeps_its_dependents_on_their_previous_form() {
        let (source, registry) = memory(&[
            (
                "a",
                r#"{"type":"object","properties":{"inner":{"$ref":"b.json"}}}"#,
            ),
            (
                "b",
                r#"{"type":"object","properties":{"x":{"type":"integer","maximum":10}}}"#,
            ),
        ]);
        let before = registry.get("a").unwrap();
        let document = json!({ "inner": { "x": 50 } });
        assert!(!registry.is_valid("a", &document).unwrap());

        // Widened, but with an example the new text itself rejects.
        source.insert(
            "b",
            r#"{"type":"object","properties":{"x":{"type":"integer","maximum":100}},"examples":[{"x":500}]}"#,
        );
        match registry.reload().unwrap() {
            ReloadOutcome::Published {
                changed, failures, ..
            } => {
                assert!(changed.is_empty());
                let names: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, vec!["b", "a"]);
                assert_eq!(
                    failures[1].error,
                    RegistryError::DependencyFailed {
                        name: "a".to_string(),
                        dependency: "b".to_string(),
                    }
                );
            }
            other => panic!("expected publish, got {other:?}"),
        }
        assert!(!registry.is_valid("b", &json!({ "x": 50 })).unwrap());
        assert!(!registry.is_valid("a", &document).unwrap());
        assert!(Arc::ptr_eq(&before, &registry.get("a").unwrap()));

        source.insert(
            "b",
            r#"{"type":"object","properties":{"x":{"type":"integer","maximum":100}},"examples":[{"x":50}]}"#,
        );
        match registry.reload().unwrap() {
            ReloadOutcome::Published {
                changed, failures, ..
            } => {
                assert_eq!(changed, vec!["a", "b"]);
                assert!(failures.is_empty());
            }
            other => panic!("expected publish, got {other:?}"),
        }
        assert!(registry.is_valid("a", &document).unwrap());
    }

    #[test]
    fn failing_target_on_first_load_fails_its_dependents() {
        let (_, registry) = memory(&[
            ("a", r#"{"properties":{"inner":{"$ref":"b.json"}}}"#),
            ("b", r#"{"type":"integer","examples":["nope"]}"#),
        ]);
        assert!(registry.names().is_empty());
        assert!(registry.report().failures.iter().any(|failure| matches!(
            &failure.error,
            RegistryError::DependencyFailed { name, dependency } if name == "a" && dependency == "b"
        )));
    }

    #[test]
    fn unreadable_files_fail_alone_on_load() {
        let dir = make_temp_schema_dir("unreadable-load");
        write_schema(&dir, "good.schema.json", r#"{"type":"null"}"#);
        write_schema(&dir, "big.schema.json", OBJECT_SCHEMA);
        std::fs::write(dir.join("bad.schema.json"), [b'{', 0xff, 0xfe, b'}']).unwrap();

        let config = RegistryConfig {
            max_schema_file_size: 64,
            ..RegistryConfig::default()
        };
        let registry = Registry::from_directory_with_config(&dir, config).unwrap();
        let report = registry.report();
        assert_eq!(report.loaded, vec!["good"]);
        let failed: Vec<&str> = report.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["bad", "big"]);
        assert!(report
            .failures
            .iter()
            .all(|failure| matches!(failure.error, RegistryError::Unreadable(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_file_does_not_block_reload() {
        let dir = make_temp_schema_dir("unreadable-reload");
        write_schema(&dir, "a.schema.json", r#"{"type":"integer"}"#);
        let registry = Registry::from_directory(&dir).unwrap();
        assert!(!registry.is_valid("a", &json!("s")).unwrap());

        write_schema(&dir, "a.schema.json", r#"{"type":"string"}"#);
        std::fs::write(dir.join("junk.json"), [0xff]).unwrap();
        match registry.reload().unwrap() {
            ReloadOutcome::Published {
                changed, failures, ..
            } => {
                assert_eq!(changed, vec!["a"]);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].name, "junk");
                assert!(matches!(failures[0].error, RegistryError::Unreadable(_)));
            }
            other => panic!("expected publish, got {other:?}"),
        }
        assert!(registry.is_valid("a", &json!("s")).unwrap());

        std::fs::remove_file(dir.join("junk.json")).unwrap();
        assert!(matches!(
            registry.reload().unwrap(),
            ReloadOutcome::Published { generation: 3, .. }
        ));
        assert!(registry.report().is_clean());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn directory_reload_picks_up_file_edits() {
        let dir = make_temp_schema_dir("reload");
        write_schema(&dir, "item.schema.json", OBJECT_SCHEMA);

        let registry = Registry::from_directory(&dir).unwrap();
        assert_eq!(registry.names(), vec!["item"]);

        write_schema(&dir, "extra.json", r#"{"type":"null"}"#);
        assert!(matches!(
            registry.reload().unwrap(),
            ReloadOutcome::Published { generation: 2, .. }
        ));
        assert!(registry.is_valid("extra", &json!(null)).unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
