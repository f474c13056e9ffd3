//! `$ref` resolution and the reference graph.
//!
//! The graph is built and checked for cycles before any constraint node is
//! materialized, so a recursive schema fails with the full cycle path.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::definition::SchemaDefinition;
use crate::error::{CompileError, Result};
use crate::path::join_pointer;

/// An addressable schema location: a document id plus a JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RefTarget {
    pub schema: String,
    pub pointer: String,
}

impl RefTarget {
    pub fn root(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            pointer: String::new(),
        }
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.schema, self.pointer)
    }
}

/// The definition being compiled plus every external definition it may
/// reference.
pub(crate) struct Definitions<'a> {
    root: &'a SchemaDefinition,
    external: &'a HashMap<String, Arc<SchemaDefinition>>,
}

impl<'a> Definitions<'a> {
    pub fn new(
        root: &'a SchemaDefinition,
        external: &'a HashMap<String, Arc<SchemaDefinition>>,
    ) -> Self {
        Self { root, external }
    }

    pub fn root_id(&self) -> &'a str {
        self.root.id()
    }

    fn document(&self, id: &str) -> Option<&'a SchemaDefinition> {
        if id == self.root.id() {
            return Some(self.root);
        }
        self.external.get(id).map(Arc::as_ref)
    }

    /// Find the canonical id for the document part of a reference.
    ///
    /// Tolerates `.json`/`.schema.json` suffixes and URI prefixes on either
    /// side.
    fn canonical_id(&self, reference: &str) -> Option<&'a str> {
        if let Some(document) = self.document(reference) {
            return Some(document.id());
        }
        let wanted = normalize_id(reference);
        std::iter::once(self.root)
            .chain(self.external.values().map(Arc::as_ref))
            .find(|candidate| normalize_id(candidate.id()) == wanted)
            .map(SchemaDefinition::id)
    }

    /// The schema value at `target`, if it exists.
    pub fn lookup(&self, target: &RefTarget) -> Option<&'a Value> {
        self.document(&target.schema)?.raw().pointer(&target.pointer)
    }

    /// Resolve a `$ref` string found inside document `current`.
    pub fn resolve(&self, current: &str, reference: &str) -> Result<RefTarget> {
        let not_found = || CompileError::SchemaNotFound {
            reference: reference.to_string(),
        };

        let (document, fragment) = reference.split_once('#').unwrap_or((reference, ""));
        if !fragment.is_empty() && !fragment.starts_with('/') {
            return Err(not_found());
        }

        let schema = if document.is_empty() {
            current.to_string()
        } else {
            self.canonical_id(document).ok_or_else(not_found)?.to_string()
        };
        let target = RefTarget {
            schema,
            pointer: fragment.to_string(),
        };

        if self.lookup(&target).is_none() {
            return Err(not_found());
        }
        Ok(target)
    }
}

fn normalize_id(id: &str) -> &str {
    let last = id.rsplit('/').next().unwrap_or(id);
    last.strip_suffix(".schema.json")
        .or_else(|| last.strip_suffix(".json"))
        .unwrap_or(last)
}

/// Directed graph of reference targets; an edge `a -> b` means the
/// evaluated subtree of `a` contains a `$ref` to `b`.
#[derive(Debug, Default)]
pub(crate) struct ReferenceGraph {
    edges: BTreeMap<RefTarget, BTreeSet<RefTarget>>,
}

impl ReferenceGraph {
    /// Walk the root definition, its `$defs`, and every target reachable
    /// from them.
    pub fn build(definitions: &Definitions<'_>) -> Result<Self> {
        let mut graph = Self::default();
        let root_id = definitions.root_id();

        let mut queue = VecDeque::new();
        queue.push_back(RefTarget::root(root_id));
        if let Some(raw) = definitions.lookup(&RefTarget::root(root_id)) {
            let mut nested = Vec::new();
            collect_definitions(raw, "", &mut nested);
            queue.extend(nested.into_iter().map(|pointer| RefTarget {
                schema: root_id.to_string(),
                pointer,
            }));
        }

        while let Some(vertex) = queue.pop_front() {
            if graph.edges.contains_key(&vertex) {
                continue;
            }
            let Some(value) = definitions.lookup(&vertex) else {
                continue;
            };

            let mut references = Vec::new();
            collect_references(value, &vertex.pointer, &mut references)?;

            let mut targets = BTreeSet::new();
            for (reference, location) in references {
                let target = definitions.resolve(&vertex.schema, &reference)?;
                trace!(from = %vertex, at = %location, to = %target, "reference edge");
                targets.insert(target);
            }
            queue.extend(targets.iter().cloned());
            graph.edges.insert(vertex, targets);
        }

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Depth-first search with grey/black colouring. A grey hit is a back
    /// edge; the reported path runs from the first repeated target to itself.
    pub fn check_acyclic(&self) -> Result<()> {
        let mut colours: HashMap<&RefTarget, Colour> = HashMap::new();
        let mut stack: Vec<&RefTarget> = Vec::new();

        for vertex in self.edges.keys() {
            if !colours.contains_key(vertex) {
                self.visit(vertex, &mut colours, &mut stack)?;
            }
        }
        Ok(())
    }

    fn visit<'g>(
        &'g self,
        vertex: &'g RefTarget,
        colours: &mut HashMap<&'g RefTarget, Colour>,
        stack: &mut Vec<&'g RefTarget>,
    ) -> Result<()> {
        colours.insert(vertex, Colour::Grey);
        stack.push(vertex);

        if let Some(targets) = self.edges.get(vertex) {
            for target in targets {
                match colours.get(target) {
                    Some(Colour::Grey) => {
                        let start = stack.iter().position(|v| *v == target).unwrap_or(0);
                        let mut path: Vec<String> =
                            stack[start..].iter().map(ToString::to_string).collect();
                        path.push(target.to_string());
                        return Err(CompileError::CyclicReference { path });
                    }
                    Some(Colour::Black) => {}
                    None => self.visit(target, colours, stack)?,
                }
            }
        }

        stack.pop();
        colours.insert(vertex, Colour::Black);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    Grey,
    Black,
}

/// Collect every `$ref` in the evaluated part of `value`.
///
/// `$defs`/`definitions` are skipped: their members only take part in
/// evaluation through a reference, which becomes its own vertex.
fn collect_references(
    value: &Value,
    pointer: &str,
    out: &mut Vec<(String, String)>,
) -> Result<()> {
    let Value::Object(map) = value else {
        return Ok(());
    };

    if let Some(reference) = map.get("$ref") {
        let reference = reference.as_str().ok_or_else(|| {
            CompileError::malformed(join_pointer(pointer, "$ref"), "`$ref` must be a string")
        })?;
        out.push((reference.to_string(), pointer.to_string()));
    }

    for (keyword, child) in map {
        match keyword.as_str() {
            "properties" => {
                if let Value::Object(properties) = child {
                    let base = join_pointer(pointer, keyword);
                    for (name, schema) in properties {
                        collect_references(schema, &join_pointer(&base, name), out)?;
                    }
                }
            }
            "additionalProperties" | "items" | "not" => {
                collect_references(child, &join_pointer(pointer, keyword), out)?;
            }
            "allOf" | "anyOf" | "oneOf" => {
                if let Value::Array(branches) = child {
                    let base = join_pointer(pointer, keyword);
                    for (index, branch) in branches.iter().enumerate() {
                        collect_references(branch, &join_pointer(&base, &index.to_string()), out)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Collect pointers to every `$defs`/`definitions` member, including
/// members nested inside other definitions.
pub(crate) fn collect_definitions(value: &Value, pointer: &str, out: &mut Vec<String>) {
    let Value::Object(map) = value else {
        return;
    };
    for keyword in ["$defs", "definitions"] {
        if let Some(Value::Object(members)) = map.get(keyword) {
            let base = join_pointer(pointer, keyword);
            for (name, member) in members {
                let member_pointer = join_pointer(&base, name);
                collect_definitions(member, &member_pointer, out);
                out.push(member_pointer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn graph_for(root: Value, external: Vec<SchemaDefinition>) -> Result<ReferenceGraph> {
        let root = SchemaDefinition::from_value("root", root);
        let external: HashMap<String, Arc<SchemaDefinition>> = external
            .into_iter()
            .map(|def| (def.id().to_string(), Arc::new(def)))
            .collect();
        let definitions = Definitions::new(&root, &external);
        let graph = ReferenceGraph::build(&definitions)?;
        graph.check_acyclic()?;
        Ok(graph)
    }

    #[test]
    fn acyclic_local_references_pass() {
        let graph = graph_for(
            json!({
                "properties": { "a": { "$ref": "#/$defs/a" } },
                "$defs": {
                    "a": { "properties": { "b": { "$ref": "#/$defs/b" } } },
                    "b": { "type": "string" }
                }
            }),
            vec![],
        )
        .unwrap();
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn two_step_cycle_reports_full_path() {
        let err = graph_for(
            json!({
                "$ref": "#/$defs/a",
                "$defs": {
                    "a": { "items": { "$ref": "#/$defs/b" } },
                    "b": { "allOf": [{ "$ref": "#/$defs/a" }] }
                }
            }),
            vec![],
        )
        .unwrap_err();

        match err {
            CompileError::CyclicReference { path } => {
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&"root#/$defs/a".to_string()));
                assert!(path.contains(&"root#/$defs/b".to_string()));
                assert_eq!(path.len(), 3);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_to_root_is_a_cycle() {
        let err = graph_for(json!({ "properties": { "child": { "$ref": "#" } } }), vec![])
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::CyclicReference {
                path: vec!["root#".to_string(), "root#".to_string()]
            }
        );
    }

    #[test]
    fn cycle_inside_unreferenced_definitions_is_still_rejected() {
        let err = graph_for(
            json!({
                "type": "object",
                "$defs": { "loop": { "not": { "$ref": "#/$defs/loop" } } }
            }),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::CyclicReference { .. }));
    }

    #[test]
    fn external_cycle_is_detected() {
        let other = SchemaDefinition::from_value("other", json!({ "$ref": "root.schema.json" }));
        let err = graph_for(json!({ "$ref": "other" }), vec![other]).unwrap_err();
        assert!(matches!(err, CompileError::CyclicReference { .. }));
    }

    #[test]
    fn missing_targets_are_schema_not_found() {
        let err = graph_for(json!({ "$ref": "#/$defs/nope" }), vec![]).unwrap_err();
        assert_eq!(
            err,
            CompileError::SchemaNotFound {
                reference: "#/$defs/nope".to_string()
            }
        );

        let err = graph_for(json!({ "$ref": "address" }), vec![]).unwrap_err();
        assert!(matches!(err, CompileError::SchemaNotFound { .. }));
    }

    #[test]
    fn non_string_ref_is_malformed() {
        let err = graph_for(json!({ "$ref": 7 }), vec![]).unwrap_err();
        assert!(matches!(err, CompileError::MalformedConstraint { .. }));
    }

    #[test]
    fn external_ids_resolve_with_suffixes_and_uri_prefixes() {
        let root = SchemaDefinition::from_value("root", json!({}));
        let address = SchemaDefinition::from_value(
            "address",
            json!({ "$id": "https://schemas.example.com/address.schema.json" }),
        );
        let external: HashMap<String, Arc<SchemaDefinition>> =
            [(address.id().to_string(), Arc::new(address))].into();
        let definitions = Definitions::new(&root, &external);

        for reference in [
            "address",
            "address.json",
            "address.schema.json",
            "https://schemas.example.com/address.schema.json",
        ] {
            let target = definitions.resolve("root", reference).unwrap();
            assert_eq!(target.schema, "https://schemas.example.com/address.schema.json");
            assert_eq!(target.pointer, "");
        }
    }
}
