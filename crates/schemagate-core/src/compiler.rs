use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::SchemaDefinition;
use crate::error::{CompileError, Result};
use crate::format::Format;
use crate::node::{
    AdditionalPolicy, ConstraintNode, JsonType, LengthBound, LengthKind, RangeBound, RangeKind,
};
use crate::path::join_pointer;
use crate::refs::{collect_definitions, Definitions, RefTarget, ReferenceGraph};
use crate::schema::CompiledSchema;

/// Keywords accepted anywhere that carry no validation semantics.
const ANNOTATIONS: [&str; 10] = [
    "$schema",
    "$id",
    "$comment",
    "title",
    "description",
    "default",
    "deprecated",
    "readOnly",
    "writeOnly",
    "examples",
];

/// Keywords that mark a schema as describing objects.
const OBJECT_KEYWORDS: [&str; 5] = [
    "properties",
    "additionalProperties",
    "required",
    "minProperties",
    "maxProperties",
];

/// Controls how definitions are compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Object schemas without `additionalProperties` reject undeclared members.
    pub strict_mode: bool,
}

/// Compiles definitions into [`CompiledSchema`]s.
///
/// External definitions registered with [`Compiler::with_definitions`] are
/// the targets available to cross-document `$ref`s.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
    definitions: HashMap<String, Arc<SchemaDefinition>>,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            definitions: HashMap::new(),
        }
    }

    /// Register definitions that `$ref`s may point at.
    pub fn with_definitions<I>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = Arc<SchemaDefinition>>,
    {
        for definition in definitions {
            self.add_definition(definition);
        }
        self
    }

    pub fn add_definition(&mut self, definition: Arc<SchemaDefinition>) {
        self.definitions
            .insert(definition.id().to_string(), definition);
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Compile one definition.
    ///
    /// Pure: the same definition and external set always produce validators
    /// with identical accept/reject behavior.
    pub fn compile(&self, definition: &SchemaDefinition) -> Result<CompiledSchema> {
        let definitions = Definitions::new(definition, &self.definitions);

        let graph = ReferenceGraph::build(&definitions)?;
        graph.check_acyclic()?;
        debug!(
            schema = definition.id(),
            targets = graph.len(),
            "reference graph is acyclic"
        );

        let mut materializer = Materializer {
            definitions: &definitions,
            options: self.options,
            memo: HashMap::new(),
            active: HashSet::new(),
            dependencies: BTreeSet::new(),
        };

        let root = materializer.compile_schema(definition.raw(), definition.id(), "")?;

        // Unreferenced definitions are compiled too, so defects inside them
        // are reported rather than ignored.
        let mut nested = Vec::new();
        collect_definitions(definition.raw(), "", &mut nested);
        for pointer in nested {
            materializer.compile_target(&RefTarget {
                schema: definition.id().to_string(),
                pointer,
            })?;
        }

        let examples = match definition.raw().get("examples") {
            None => Vec::new(),
            Some(Value::Array(examples)) => examples.clone(),
            Some(_) => {
                return Err(CompileError::malformed(
                    location(definition.id(), "/examples"),
                    "`examples` must be an array",
                ))
            }
        };

        let dependencies = materializer.dependencies;
        debug!(
            schema = definition.id(),
            version = definition.version(),
            dependencies = dependencies.len(),
            "schema compiled"
        );

        Ok(CompiledSchema::new(definition, root, examples, dependencies))
    }
}

/// Compile with default options and no external definitions.
pub fn compile(definition: &SchemaDefinition) -> Result<CompiledSchema> {
    Compiler::default().compile(definition)
}

struct Materializer<'d, 'a> {
    definitions: &'d Definitions<'a>,
    options: CompileOptions,
    memo: HashMap<RefTarget, Arc<ConstraintNode>>,
    active: HashSet<RefTarget>,
    dependencies: BTreeSet<String>,
}

fn location(schema: &str, pointer: &str) -> String {
    format!("{schema}#{pointer}")
}

impl Materializer<'_, '_> {
    /// Compile a reference target once; later references share the node.
    fn compile_target(&mut self, target: &RefTarget) -> Result<Arc<ConstraintNode>> {
        if let Some(node) = self.memo.get(target) {
            return Ok(Arc::clone(node));
        }
        // The graph pass already rejected cycles; this guards the recursion.
        if !self.active.insert(target.clone()) {
            return Err(CompileError::CyclicReference {
                path: vec![target.to_string(), target.to_string()],
            });
        }

        let value = self
            .definitions
            .lookup(target)
            .ok_or_else(|| CompileError::SchemaNotFound {
                reference: target.to_string(),
            })?;
        let node = Arc::new(self.compile_schema(value, &target.schema, &target.pointer)?);

        self.active.remove(target);
        self.memo.insert(target.clone(), Arc::clone(&node));
        Ok(node)
    }

    fn compile_schema(
        &mut self,
        value: &Value,
        schema: &str,
        pointer: &str,
    ) -> Result<ConstraintNode> {
        match value {
            Value::Bool(true) => Ok(ConstraintNode::Accept),
            Value::Bool(false) => Ok(ConstraintNode::Reject),
            Value::Object(map) => self.compile_object(map, schema, pointer),
            _ => Err(CompileError::malformed(
                location(schema, pointer),
                "schema must be an object or a boolean",
            )),
        }
    }

    fn compile_object(
        &mut self,
        map: &Map<String, Value>,
        schema: &str,
        pointer: &str,
    ) -> Result<ConstraintNode> {
        let mut nodes = Vec::new();
        let mut declared = BTreeSet::new();
        let mut additional: Option<&Value> = None;

        for (keyword, value) in map {
            let at = join_pointer(pointer, keyword);
            let malformed = |detail: &str| CompileError::malformed(location(schema, &at), detail);

            match keyword.as_str() {
                k if ANNOTATIONS.contains(&k) => {}
                "version" => {
                    if !pointer.is_empty() {
                        return Err(CompileError::UnsupportedKeyword {
                            name: keyword.clone(),
                            location: location(schema, &at),
                        });
                    }
                    if !value.is_string() {
                        return Err(malformed("`version` must be a string"));
                    }
                }
                "$defs" | "definitions" => {
                    if !value.is_object() {
                        return Err(malformed("definitions must be an object"));
                    }
                }
                "$ref" => {
                    let reference = value
                        .as_str()
                        .ok_or_else(|| malformed("`$ref` must be a string"))?;
                    let target = self.definitions.resolve(schema, reference)?;
                    if target.schema != self.definitions.root_id() {
                        self.dependencies.insert(target.schema.clone());
                    }
                    let node = self.compile_target(&target)?;
                    nodes.push(ConstraintNode::Ref {
                        target: reference.to_string(),
                        node,
                    });
                }
                "type" => {
                    let types = parse_types(value).map_err(|detail| malformed(&detail))?;
                    nodes.push(ConstraintNode::Type(types));
                }
                "format" => {
                    let name = value
                        .as_str()
                        .ok_or_else(|| malformed("`format` must be a string"))?;
                    let format = Format::parse(name)
                        .ok_or_else(|| malformed(&format!("unknown format `{name}`")))?;
                    nodes.push(ConstraintNode::Format(format));
                }
                "minimum" | "maximum" | "exclusiveMinimum" | "exclusiveMaximum" | "multipleOf" => {
                    let Value::Number(limit) = value else {
                        return Err(malformed(&format!("`{keyword}` must be a number")));
                    };
                    let kind = match keyword.as_str() {
                        "minimum" => RangeKind::Minimum,
                        "maximum" => RangeKind::Maximum,
                        "exclusiveMinimum" => RangeKind::ExclusiveMinimum,
                        "exclusiveMaximum" => RangeKind::ExclusiveMaximum,
                        _ => RangeKind::MultipleOf,
                    };
                    if kind == RangeKind::MultipleOf && !limit.as_f64().is_some_and(|f| f > 0.0) {
                        return Err(malformed("`multipleOf` must be greater than zero"));
                    }
                    nodes.push(ConstraintNode::Range(RangeBound {
                        kind,
                        limit: limit.clone(),
                    }));
                }
                "minLength" | "maxLength" | "minItems" | "maxItems" | "minProperties"
                | "maxProperties" => {
                    let limit = value
                        .as_u64()
                        .and_then(|limit| usize::try_from(limit).ok())
                        .ok_or_else(|| {
                            malformed(&format!("`{keyword}` must be a non-negative integer"))
                        })?;
                    let kind = match keyword.as_str() {
                        "minLength" => LengthKind::MinLength,
                        "maxLength" => LengthKind::MaxLength,
                        "minItems" => LengthKind::MinItems,
                        "maxItems" => LengthKind::MaxItems,
                        "minProperties" => LengthKind::MinProperties,
                        _ => LengthKind::MaxProperties,
                    };
                    nodes.push(ConstraintNode::Length(LengthBound { kind, limit }));
                }
                "pattern" => {
                    let source = value
                        .as_str()
                        .ok_or_else(|| malformed("`pattern` must be a string"))?;
                    let regex = Regex::new(source)
                        .map_err(|err| malformed(&format!("invalid pattern: {err}")))?;
                    nodes.push(ConstraintNode::Pattern(regex));
                }
                "enum" => match value {
                    Value::Array(options) if !options.is_empty() => {
                        nodes.push(ConstraintNode::Enum(options.clone()));
                    }
                    _ => return Err(malformed("`enum` must be a non-empty array")),
                },
                "const" => nodes.push(ConstraintNode::Const(value.clone())),
                "uniqueItems" => match value {
                    Value::Bool(true) => nodes.push(ConstraintNode::UniqueItems),
                    Value::Bool(false) => {}
                    _ => return Err(malformed("`uniqueItems` must be a boolean")),
                },
                "required" => {
                    let names = parse_required(value).map_err(|detail| malformed(&detail))?;
                    nodes.push(ConstraintNode::RequiredSet(names));
                }
                "properties" => {
                    let Value::Object(members) = value else {
                        return Err(malformed("`properties` must be an object"));
                    };
                    let mut properties = BTreeMap::new();
                    for (name, member) in members {
                        let node = self.compile_schema(member, schema, &join_pointer(&at, name))?;
                        declared.insert(name.clone());
                        properties.insert(name.clone(), node);
                    }
                    nodes.push(ConstraintNode::Properties(properties));
                }
                "additionalProperties" => additional = Some(value),
                "items" => {
                    if value.is_array() {
                        return Err(malformed("`items` must be a single schema"));
                    }
                    let node = self.compile_schema(value, schema, &at)?;
                    nodes.push(ConstraintNode::Items(Box::new(node)));
                }
                "allOf" | "anyOf" | "oneOf" => {
                    let branches = match value {
                        Value::Array(branches) if !branches.is_empty() => branches,
                        _ => {
                            return Err(malformed(&format!(
                                "`{keyword}` must be a non-empty array"
                            )))
                        }
                    };
                    let mut nodes_for_branches = Vec::with_capacity(branches.len());
                    for (index, branch) in branches.iter().enumerate() {
                        nodes_for_branches.push(self.compile_schema(
                            branch,
                            schema,
                            &join_pointer(&at, &index.to_string()),
                        )?);
                    }
                    nodes.push(match keyword.as_str() {
                        "allOf" => ConstraintNode::AllOf(nodes_for_branches),
                        "anyOf" => ConstraintNode::AnyOf(nodes_for_branches),
                        _ => ConstraintNode::OneOf(nodes_for_branches),
                    });
                }
                "not" => {
                    let node = self.compile_schema(value, schema, &at)?;
                    nodes.push(ConstraintNode::Not(Box::new(node)));
                }
                _ => {
                    return Err(CompileError::UnsupportedKeyword {
                        name: keyword.clone(),
                        location: location(schema, &at),
                    })
                }
            }
        }

        let at = join_pointer(pointer, "additionalProperties");
        match additional {
            Some(Value::Bool(true)) => {}
            Some(Value::Bool(false)) => nodes.push(ConstraintNode::AdditionalProperties {
                declared,
                policy: AdditionalPolicy::Forbid,
            }),
            Some(value @ Value::Object(_)) => {
                let node = self.compile_schema(value, schema, &at)?;
                nodes.push(ConstraintNode::AdditionalProperties {
                    declared,
                    policy: AdditionalPolicy::Schema(Box::new(node)),
                });
            }
            Some(_) => {
                return Err(CompileError::malformed(
                    location(schema, &at),
                    "`additionalProperties` must be a boolean or a schema",
                ))
            }
            None if self.options.strict_mode && describes_object(map) => {
                nodes.push(ConstraintNode::AdditionalProperties {
                    declared,
                    policy: AdditionalPolicy::Forbid,
                });
            }
            None => {}
        }

        Ok(ConstraintNode::Schema(nodes))
    }
}

fn parse_types(value: &Value) -> std::result::Result<Vec<JsonType>, String> {
    let parse_one = |item: &Value| {
        let name = item
            .as_str()
            .ok_or_else(|| "`type` entries must be strings".to_string())?;
        JsonType::parse(name).ok_or_else(|| format!("unknown type `{name}`"))
    };

    match value {
        Value::String(_) => Ok(vec![parse_one(value)?]),
        Value::Array(items) if !items.is_empty() => items.iter().map(parse_one).collect(),
        _ => Err("`type` must be a string or a non-empty array".to_string()),
    }
}

fn parse_required(value: &Value) -> std::result::Result<Vec<String>, String> {
    let Value::Array(items) = value else {
        return Err("`required` must be an array of strings".to_string());
    };
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        let name = item
            .as_str()
            .ok_or_else(|| "`required` must be an array of strings".to_string())?;
        if names.iter().any(|existing: &String| existing == name) {
            return Err(format!("`required` lists `{name}` more than once"));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

fn describes_object(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| matches!(item, Value::String(kind) if kind == "object")),
        _ => OBJECT_KEYWORDS
            .iter()
            .any(|keyword| map.contains_key(*keyword)),
    }
}
