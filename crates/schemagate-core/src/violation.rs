use std::fmt;

use serde::Serialize;

use crate::path::{InstancePath, SchemaPath};

/// Category of a single document violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    TypeMismatch,
    MissingRequired,
    /// `pattern` or `format` rejected a string.
    PatternMismatch,
    /// Numeric bound, `multipleOf`, or a length/count bound.
    RangeViolation,
    /// `enum` or `const`.
    EnumViolation,
    AdditionalPropertyNotAllowed,
    /// `anyOf`, `oneOf`, `not`, or a `false` schema.
    CompositionFailure,
    /// `uniqueItems` found two equal elements.
    DuplicateItems,
}

impl ValidationErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TypeMismatch => "type_mismatch",
            Self::MissingRequired => "missing_required",
            Self::PatternMismatch => "pattern_mismatch",
            Self::RangeViolation => "range_violation",
            Self::EnumViolation => "enum_violation",
            Self::AdditionalPropertyNotAllowed => "additional_property_not_allowed",
            Self::CompositionFailure => "composition_failure",
            Self::DuplicateItems => "duplicate_items",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violated constraint, located in both the document and the schema.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{}: {detail} ({kind} at {schema_path})", display_instance(.instance_path))]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub instance_path: InstancePath,
    pub schema_path: SchemaPath,
    pub detail: String,
}

fn display_instance(path: &InstancePath) -> String {
    if path.is_root() {
        "(root)".to_string()
    } else {
        path.to_string()
    }
}
