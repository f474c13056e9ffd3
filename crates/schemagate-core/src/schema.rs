use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::definition::SchemaDefinition;
use crate::error::{CompileError, Result};
use crate::node::ConstraintNode;
use crate::validator::validate;
use crate::violation::ValidationError;

/// A fully resolved, immutable validator for one schema definition.
///
/// Produced by [`Compiler::compile`](crate::Compiler::compile); replaced,
/// never mutated, when its source changes.
#[derive(Debug)]
pub struct CompiledSchema {
    id: String,
    version: String,
    origin: String,
    content_hash: String,
    root: ConstraintNode,
    examples: Vec<Value>,
    properties: Vec<String>,
    required_paths: BTreeMap<String, Vec<String>>,
    dependencies: BTreeSet<String>,
}

impl CompiledSchema {
    pub(crate) fn new(
        definition: &SchemaDefinition,
        root: ConstraintNode,
        examples: Vec<Value>,
        dependencies: BTreeSet<String>,
    ) -> Self {
        let mut required_paths = BTreeMap::new();
        collect_required_paths(&root, &[], &mut required_paths);

        Self {
            id: definition.id().to_string(),
            version: definition.version().to_string(),
            origin: definition.origin().to_string(),
            content_hash: definition.content_hash().to_string(),
            root,
            examples,
            properties: definition
                .property_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            required_paths,
            dependencies,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// SHA-256 of the source content this schema was compiled from.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn root(&self) -> &ConstraintNode {
        &self.root
    }

    /// Example documents declared by the schema.
    pub fn examples(&self) -> &[Value] {
        &self.examples
    }

    /// Top-level declared property names, in declaration order.
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Ids of other definitions this schema references.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Dotted paths that every document accepted by this schema contains.
    pub fn required_paths(&self) -> impl Iterator<Item = &str> {
        self.required_paths.keys().map(String::as_str)
    }

    /// The object keys walked to reach a required path, if `path` is one.
    pub fn required_path(&self, path: &str) -> Option<&[String]> {
        self.required_paths.get(path).map(Vec::as_slice)
    }

    pub fn validate(&self, document: &Value) -> Vec<ValidationError> {
        validate(self, document)
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        validate(self, document).is_empty()
    }

    /// Validate every declared example; returns the violations of each
    /// rejected example by index.
    pub fn self_test(&self) -> Vec<(usize, Vec<ValidationError>)> {
        self.examples
            .iter()
            .enumerate()
            .filter_map(|(index, example)| {
                let violations = validate(self, example);
                (!violations.is_empty()).then_some((index, violations))
            })
            .collect()
    }

    /// Fail with the first rejected example, if any.
    pub fn verify_examples(&self) -> Result<()> {
        match self.self_test().into_iter().next() {
            Some((index, violations)) => Err(CompileError::ExampleRejected { index, violations }),
            None => Ok(()),
        }
    }
}

/// Record `prefix.name` for every required member of an object-only node,
/// descending into declared members that are themselves object-only.
///
/// Only object-only nodes qualify: `required` does not constrain other kinds.
fn collect_required_paths(
    node: &ConstraintNode,
    prefix: &[String],
    out: &mut BTreeMap<String, Vec<String>>,
) {
    if !node.requires_object() {
        return;
    }

    let mut required = Vec::new();
    let mut properties = Vec::new();
    node.object_requirements(&mut required, &mut properties);

    // Names the accessor syntax cannot address are left out.
    let addressable = |name: &&str| !name.is_empty() && !name.contains(['.', '[', ']']);

    for name in required.into_iter().filter(addressable) {
        let mut keys = prefix.to_vec();
        keys.push(name.to_string());
        for (_, child) in properties.iter().filter(|(declared, _)| *declared == name) {
            collect_required_paths(child, &keys, out);
        }
        out.insert(keys.join("."), keys);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::compiler::compile;
    use crate::violation::ValidationErrorKind;

    fn user_schema() -> CompiledSchema {
        compile(&SchemaDefinition::from_value(
            "user",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "minLength": 1 },
                    "email": { "type": "string", "format": "email" },
                    "address": {
                        "type": "object",
                        "properties": { "city": { "type": "string" } },
                        "required": ["city"]
                    },
                    "tags": { "properties": { "x": {} }, "required": ["x"] }
                },
                "required": ["email", "name", "address", "tags"],
                "examples": [
                    { "name": "A", "email": "a@b.com", "address": { "city": "Oslo" }, "tags": { "x": 1 } },
                    { "name": "", "email": "nope", "address": { "city": "Oslo" }, "tags": {} }
                ]
            }),
        ))
        .unwrap()
    }

    #[test]
    fn exposes_introspection_surface() {
        let schema = user_schema();
        assert_eq!(schema.id(), "user");
        assert_eq!(schema.properties(), ["name", "email", "address", "tags"]);
        assert_eq!(schema.examples().len(), 2);
    }

    #[test]
    fn required_paths_descend_only_into_object_only_members() {
        let schema = user_schema();
        let paths: Vec<&str> = schema.required_paths().collect();
        assert_eq!(paths, vec!["address", "address.city", "email", "name", "tags"]);
        assert_eq!(
            schema.required_path("address.city"),
            Some(&["address".to_string(), "city".to_string()][..])
        );
        assert_eq!(schema.required_path("tags.x"), None);
    }

    #[test]
    fn self_test_reports_rejected_examples() {
        let schema = user_schema();
        let rejected = schema.self_test();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, 1);
        let kinds: Vec<_> = rejected[0].1.iter().map(|v| v.kind).collect();
        assert!(kinds.contains(&ValidationErrorKind::RangeViolation));
        assert!(kinds.contains(&ValidationErrorKind::PatternMismatch));
        assert!(kinds.contains(&ValidationErrorKind::MissingRequired));

        assert!(matches!(
            schema.verify_examples(),
            Err(CompileError::ExampleRejected { index: 1, .. })
        ));
    }

    #[test]
    fn root_without_object_type_has_no_required_paths() {
        let schema = compile(&SchemaDefinition::from_value(
            "loose",
            json!({ "required": ["a"] }),
        ))
        .unwrap();
        assert_eq!(schema.required_paths().count(), 0);
    }
}
