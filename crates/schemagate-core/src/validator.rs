//! Accumulating evaluation of a constraint tree against a document.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::node::{
    json_equal, AdditionalPolicy, ConstraintNode, JsonType, LengthBound, LengthKind, RangeBound,
    RangeKind,
};
use crate::path::{InstancePath, PathSegment, SchemaPath};
use crate::schema::CompiledSchema;
use crate::violation::{ValidationError, ValidationErrorKind};

/// Validate `document` against `schema`, reporting every violated leaf.
///
/// An empty list means the document is valid.
pub fn validate(schema: &CompiledSchema, document: &Value) -> Vec<ValidationError> {
    let mut evaluation = Evaluation::default();
    evaluation.evaluate(schema.root(), document);
    evaluation.errors
}

#[derive(Default)]
struct Evaluation {
    instance: Vec<PathSegment>,
    schema: Vec<String>,
    errors: Vec<ValidationError>,
}

impl Evaluation {
    fn evaluate(&mut self, node: &ConstraintNode, value: &Value) {
        match node {
            ConstraintNode::Accept => {}
            ConstraintNode::Reject => {
                self.report(
                    ValidationErrorKind::CompositionFailure,
                    "schema is false".to_string(),
                );
            }
            ConstraintNode::Schema(children) => {
                for child in children {
                    self.schema.push(child.keyword().to_string());
                    self.evaluate(child, value);
                    self.schema.pop();
                }
            }
            ConstraintNode::Type(types) => {
                if !types.iter().any(|ty| ty.matches(value)) {
                    let expected: Vec<&str> = types.iter().map(|ty| ty.as_str()).collect();
                    self.report(
                        ValidationErrorKind::TypeMismatch,
                        format!(
                            "expected {}, found {}",
                            expected.join(" or "),
                            JsonType::of(value)
                        ),
                    );
                }
            }
            ConstraintNode::Format(format) => {
                if let Value::String(text) = value {
                    if !format.is_valid(text) {
                        self.report(
                            ValidationErrorKind::PatternMismatch,
                            format!("{value} is not a valid {}", format.as_str()),
                        );
                    }
                }
            }
            ConstraintNode::Range(bound) => {
                if let Value::Number(number) = value {
                    if let Some(detail) = check_range(bound, number) {
                        self.report(ValidationErrorKind::RangeViolation, detail);
                    }
                }
            }
            ConstraintNode::Length(bound) => self.check_length(bound, value),
            ConstraintNode::Pattern(regex) => {
                if let Value::String(text) = value {
                    if !regex.is_match(text) {
                        self.report(
                            ValidationErrorKind::PatternMismatch,
                            format!("{value} does not match pattern `{}`", regex.as_str()),
                        );
                    }
                }
            }
            ConstraintNode::Enum(allowed) => {
                if !allowed.iter().any(|candidate| json_equal(candidate, value)) {
                    self.report(
                        ValidationErrorKind::EnumViolation,
                        format!("{value} is not one of {}", Value::Array(allowed.clone())),
                    );
                }
            }
            ConstraintNode::Const(expected) => {
                if !json_equal(expected, value) {
                    self.report(
                        ValidationErrorKind::EnumViolation,
                        format!("{value} is not {expected}"),
                    );
                }
            }
            ConstraintNode::UniqueItems => {
                if let Value::Array(items) = value {
                    if let Some((first, second)) = first_duplicate(items) {
                        self.report(
                            ValidationErrorKind::DuplicateItems,
                            format!("items {first} and {second} are equal"),
                        );
                    }
                }
            }
            ConstraintNode::RequiredSet(names) => {
                if let Value::Object(members) = value {
                    for name in names.iter().filter(|name| !members.contains_key(name.as_str())) {
                        self.report(
                            ValidationErrorKind::MissingRequired,
                            format!("missing required property `{name}`"),
                        );
                    }
                }
            }
            ConstraintNode::Properties(declared) => {
                if let Value::Object(members) = value {
                    for (name, child) in declared {
                        if let Some(member) = members.get(name) {
                            self.schema.push(name.clone());
                            self.instance.push(PathSegment::Key(name.clone()));
                            self.evaluate(child, member);
                            self.instance.pop();
                            self.schema.pop();
                        }
                    }
                }
            }
            ConstraintNode::AdditionalProperties { declared, policy } => {
                if let Value::Object(members) = value {
                    let extra = members
                        .iter()
                        .filter(|(name, _)| !declared.contains(name.as_str()));
                    for (name, member) in extra {
                        self.instance.push(PathSegment::Key(name.clone()));
                        match policy {
                            AdditionalPolicy::Forbid => self.report(
                                ValidationErrorKind::AdditionalPropertyNotAllowed,
                                format!("property `{name}` is not allowed"),
                            ),
                            AdditionalPolicy::Schema(child) => self.evaluate(child, member),
                        }
                        self.instance.pop();
                    }
                }
            }
            ConstraintNode::Items(child) => {
                if let Value::Array(items) = value {
                    for (index, item) in items.iter().enumerate() {
                        self.instance.push(PathSegment::Index(index));
                        self.evaluate(child, item);
                        self.instance.pop();
                    }
                }
            }
            ConstraintNode::AllOf(branches) => {
                for (index, branch) in branches.iter().enumerate() {
                    self.schema.push(index.to_string());
                    self.evaluate(branch, value);
                    self.schema.pop();
                }
            }
            ConstraintNode::AnyOf(branches) => {
                let outcomes = self.branch_outcomes(branches, value);
                if !outcomes.contains(&0) {
                    self.report(
                        ValidationErrorKind::CompositionFailure,
                        format!("no anyOf branch matched ({})", summarize(&outcomes)),
                    );
                }
            }
            ConstraintNode::OneOf(branches) => {
                let outcomes = self.branch_outcomes(branches, value);
                let passed: Vec<usize> = outcomes
                    .iter()
                    .enumerate()
                    .filter_map(|(index, count)| (*count == 0).then_some(index))
                    .collect();
                match passed.as_slice() {
                    [_] => {}
                    [] => self.report(
                        ValidationErrorKind::CompositionFailure,
                        format!("no oneOf branch matched ({})", summarize(&outcomes)),
                    ),
                    several => {
                        let indices: Vec<String> = several.iter().map(usize::to_string).collect();
                        self.report(
                            ValidationErrorKind::CompositionFailure,
                            format!(
                                "exactly one oneOf branch must match, but branches {} did",
                                indices.join(", ")
                            ),
                        );
                    }
                }
            }
            ConstraintNode::Not(inner) => {
                if self.passes(inner, value) {
                    self.report(
                        ValidationErrorKind::CompositionFailure,
                        "value matches a schema it must not match".to_string(),
                    );
                }
            }
            ConstraintNode::Ref { node, .. } => self.evaluate(node, value),
        }
    }

    /// Evaluate `node` speculatively and count its violations, discarding them.
    fn count_violations(&mut self, node: &ConstraintNode, value: &Value) -> usize {
        let mark = self.errors.len();
        self.evaluate(node, value);
        let count = self.errors.len() - mark;
        self.errors.truncate(mark);
        count
    }

    fn passes(&mut self, node: &ConstraintNode, value: &Value) -> bool {
        self.count_violations(node, value) == 0
    }

    /// Violation count of each branch, in branch order.
    fn branch_outcomes(&mut self, branches: &[ConstraintNode], value: &Value) -> Vec<usize> {
        let mut outcomes = Vec::with_capacity(branches.len());
        for (index, branch) in branches.iter().enumerate() {
            self.schema.push(index.to_string());
            outcomes.push(self.count_violations(branch, value));
            self.schema.pop();
        }
        outcomes
    }

    fn check_length(&mut self, bound: &LengthBound, value: &Value) {
        let (actual, unit) = match (bound.kind, value) {
            (LengthKind::MinLength | LengthKind::MaxLength, Value::String(text)) => {
                (text.chars().count(), "characters")
            }
            (LengthKind::MinItems | LengthKind::MaxItems, Value::Array(items)) => {
                (items.len(), "items")
            }
            (LengthKind::MinProperties | LengthKind::MaxProperties, Value::Object(members)) => {
                (members.len(), "properties")
            }
            _ => return,
        };

        let violated = if bound.kind.is_minimum() {
            actual < bound.limit
        } else {
            actual > bound.limit
        };
        if violated {
            self.report(
                ValidationErrorKind::RangeViolation,
                format!("has {actual} {unit}, {} is {}", bound.kind.keyword(), bound.limit),
            );
        }
    }

    fn report(&mut self, kind: ValidationErrorKind, detail: String) {
        self.errors.push(ValidationError {
            kind,
            instance_path: InstancePath::from(self.instance.clone()),
            schema_path: SchemaPath::from(self.schema.clone()),
            detail,
        });
    }
}

fn check_range(bound: &RangeBound, number: &Number) -> Option<String> {
    let limit = &bound.limit;
    let violated = match bound.kind {
        RangeKind::Minimum => compare(number, limit) == Some(Ordering::Less),
        RangeKind::Maximum => compare(number, limit) == Some(Ordering::Greater),
        RangeKind::ExclusiveMinimum => compare(number, limit) != Some(Ordering::Greater),
        RangeKind::ExclusiveMaximum => compare(number, limit) != Some(Ordering::Less),
        RangeKind::MultipleOf => !is_multiple_of(number, limit),
    };
    if !violated {
        return None;
    }

    let relation = match bound.kind {
        RangeKind::Minimum => "less than minimum",
        RangeKind::Maximum => "greater than maximum",
        RangeKind::ExclusiveMinimum => "not greater than exclusiveMinimum",
        RangeKind::ExclusiveMaximum => "not less than exclusiveMaximum",
        RangeKind::MultipleOf => "not a multiple of",
    };
    Some(format!("{number} is {relation} {limit}"))
}

/// Compare exactly where both sides fit an integer type, else as floats.
fn compare(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

fn is_multiple_of(number: &Number, divisor: &Number) -> bool {
    if let (Some(x), Some(y)) = (number.as_i64(), divisor.as_i64()) {
        return y != 0 && x % y == 0;
    }
    match (number.as_f64(), divisor.as_f64()) {
        (Some(x), Some(y)) if y != 0.0 => {
            let quotient = x / y;
            (quotient - quotient.round()).abs() < 1e-9
        }
        _ => false,
    }
}

fn summarize(outcomes: &[usize]) -> String {
    outcomes
        .iter()
        .enumerate()
        .map(|(index, count)| match count {
            1 => format!("branch {index}: 1 violation"),
            n => format!("branch {index}: {n} violations"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_duplicate(items: &[Value]) -> Option<(usize, usize)> {
    items.iter().enumerate().find_map(|(first, item)| {
        items[first + 1..]
            .iter()
            .position(|other| json_equal(item, other))
            .map(|offset| (first, first + 1 + offset))
    })
}
