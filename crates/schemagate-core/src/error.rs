use crate::violation::ValidationError;

/// Errors that can occur while compiling a schema definition.
///
/// Every variant is fatal to the one schema being compiled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// The definition text is not valid JSON.
    #[error("schema definition is not valid JSON: {0}")]
    InvalidJson(String),

    /// A `$ref` points at a document or location that does not exist.
    #[error("referenced schema not found: {reference}")]
    SchemaNotFound { reference: String },

    /// References form a cycle; `path` starts and ends at the same target.
    #[error("cyclic reference: {}", .path.join(" -> "))]
    CyclicReference { path: Vec<String> },

    /// A keyword is known but its value is ill-formed.
    #[error("malformed constraint at {location}: {detail}")]
    MalformedConstraint { location: String, detail: String },

    /// The keyword is not part of the supported dialect.
    #[error("unsupported keyword `{name}` at {location}")]
    UnsupportedKeyword { name: String, location: String },

    /// A declared example does not validate against its own schema.
    #[error("example {index} is rejected by its own schema ({} violations)", .violations.len())]
    ExampleRejected {
        index: usize,
        violations: Vec<ValidationError>,
    },
}

impl CompileError {
    pub(crate) fn malformed(location: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedConstraint {
            location: location.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
