//! The compiled constraint tree.
//!
//! A closed sum type: the keyword set is fixed by the schema dialect, so the
//! validator dispatches with one exhaustive `match`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::{Number, Value};

use crate::format::Format;

/// JSON value kinds named by the `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// The most specific kind of `value`; integral numbers are `Integer`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(number) if is_integral(number) => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match (self, Self::of(value)) {
            (Self::Number, Self::Integer) => true,
            (expected, actual) => expected == actual,
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn is_integral(number: &Number) -> bool {
    number.is_i64() || number.is_u64() || number.as_f64().is_some_and(|f| f.fract() == 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MultipleOf,
}

impl RangeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::ExclusiveMinimum => "exclusiveMinimum",
            Self::ExclusiveMaximum => "exclusiveMaximum",
            Self::MultipleOf => "multipleOf",
        }
    }
}

/// A numeric bound, kept as authored so diagnostics cite `150`, not `150.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub kind: RangeKind,
    pub limit: Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthKind {
    MinLength,
    MaxLength,
    MinItems,
    MaxItems,
    MinProperties,
    MaxProperties,
}

impl LengthKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::MinItems => "minItems",
            Self::MaxItems => "maxItems",
            Self::MinProperties => "minProperties",
            Self::MaxProperties => "maxProperties",
        }
    }

    pub fn is_minimum(self) -> bool {
        matches!(self, Self::MinLength | Self::MinItems | Self::MinProperties)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBound {
    pub kind: LengthKind,
    pub limit: usize,
}

/// What happens to object members not named in `properties`.
#[derive(Debug, Clone)]
pub enum AdditionalPolicy {
    Forbid,
    Schema(Box<ConstraintNode>),
}

#[derive(Debug, Clone)]
pub enum ConstraintNode {
    /// The `true` schema.
    Accept,
    /// The `false` schema.
    Reject,
    /// One schema object: the nodes for each of its keywords.
    Schema(Vec<ConstraintNode>),
    Type(Vec<JsonType>),
    Format(Format),
    Range(RangeBound),
    Length(LengthBound),
    Pattern(Regex),
    Enum(Vec<Value>),
    Const(Value),
    UniqueItems,
    RequiredSet(Vec<String>),
    Properties(BTreeMap<String, ConstraintNode>),
    AdditionalProperties {
        declared: BTreeSet<String>,
        policy: AdditionalPolicy,
    },
    Items(Box<ConstraintNode>),
    AllOf(Vec<ConstraintNode>),
    AnyOf(Vec<ConstraintNode>),
    OneOf(Vec<ConstraintNode>),
    Not(Box<ConstraintNode>),
    /// A resolved reference: `node` is the materialized target.
    Ref {
        target: String,
        node: Arc<ConstraintNode>,
    },
}

impl ConstraintNode {
    /// Schema keyword this node was compiled from; empty for whole schemas.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Accept | Self::Reject | Self::Schema(_) => "",
            Self::Type(_) => "type",
            Self::Format(_) => "format",
            Self::Range(bound) => bound.kind.keyword(),
            Self::Length(bound) => bound.kind.keyword(),
            Self::Pattern(_) => "pattern",
            Self::Enum(_) => "enum",
            Self::Const(_) => "const",
            Self::UniqueItems => "uniqueItems",
            Self::RequiredSet(_) => "required",
            Self::Properties(_) => "properties",
            Self::AdditionalProperties { .. } => "additionalProperties",
            Self::Items(_) => "items",
            Self::AllOf(_) => "allOf",
            Self::AnyOf(_) => "anyOf",
            Self::OneOf(_) => "oneOf",
            Self::Not(_) => "not",
            Self::Ref { .. } => "$ref",
        }
    }

    /// Whether this node restricts values to objects and nothing else.
    pub(crate) fn requires_object(&self) -> bool {
        match self {
            Self::Type(types) => types.iter().all(|ty| *ty == JsonType::Object),
            Self::Schema(children) => children.iter().any(Self::requires_object),
            Self::AllOf(branches) => branches.iter().any(Self::requires_object),
            Self::Ref { node, .. } => node.requires_object(),
            _ => false,
        }
    }

    /// Required names and declared property nodes that apply whenever this
    /// node accepts a value, following `$ref` and `allOf`.
    pub(crate) fn object_requirements<'a>(
        &'a self,
        required: &mut Vec<&'a str>,
        properties: &mut Vec<(&'a str, &'a ConstraintNode)>,
    ) {
        match self {
            Self::Schema(children) => {
                for child in children {
                    child.object_requirements(required, properties);
                }
            }
            Self::RequiredSet(names) => required.extend(names.iter().map(String::as_str)),
            Self::Properties(declared) => {
                properties.extend(declared.iter().map(|(name, node)| (name.as_str(), node)));
            }
            Self::AllOf(branches) => {
                for branch in branches {
                    branch.object_requirements(required, properties);
                }
            }
            Self::Ref { node, .. } => node.object_requirements(required, properties),
            _ => {}
        }
    }
}

/// JSON equality where numbers compare by value (`1` equals `1.0`).
pub(crate) fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => left == right,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn integer_kind_accepts_integral_floats() {
        assert_eq!(JsonType::of(&json!(3)), JsonType::Integer);
        assert_eq!(JsonType::of(&json!(3.0)), JsonType::Integer);
        assert_eq!(JsonType::of(&json!(3.5)), JsonType::Number);
        assert!(JsonType::Number.matches(&json!(3)));
        assert!(!JsonType::Integer.matches(&json!(3.5)));
        assert!(!JsonType::String.matches(&json!(3)));
    }

    #[test]
    fn json_equal_compares_numbers_by_value() {
        assert!(json_equal(&json!(1), &json!(1.0)));
        assert!(json_equal(&json!({"a": [1, 2]}), &json!({"a": [1.0, 2]})));
        assert!(!json_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!json_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn keyword_names_match_dialect() {
        let bound = ConstraintNode::Range(RangeBound {
            kind: RangeKind::ExclusiveMaximum,
            limit: Number::from(10),
        });
        assert_eq!(bound.keyword(), "exclusiveMaximum");
        assert_eq!(ConstraintNode::UniqueItems.keyword(), "uniqueItems");
        assert_eq!(ConstraintNode::Accept.keyword(), "");
    }
}
