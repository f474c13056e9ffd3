use schemagate_core::{CompileError, ValidationError};

/// Errors raised by registry loading, reloading and lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// The schema source could not be read, or broke a configured limit.
    #[error("failed to load schemas: {0}")]
    LoadFailed(String),

    /// One source entry could not be read; the rest of the source still loads.
    #[error("unreadable schema source entry: {0}")]
    Unreadable(String),

    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    #[error("unknown schema version: {0}")]
    UnknownVersion(String),

    /// A version label may be published once.
    #[error("schema version already published: {0}")]
    VersionExists(String),

    #[error("no schema versions could be loaded")]
    NoVersions,

    #[error("schema {name} failed to compile: {source}")]
    Compile { name: String, source: CompileError },

    /// A schema this one references failed in the same pass, so this one
    /// keeps its previous form too.
    #[error("schema {name} depends on {dependency}, which failed to load")]
    DependencyFailed { name: String, dependency: String },

    /// A second source entry claimed an already loaded name or id.
    #[error("duplicate schema: {0}")]
    DuplicateSchema(String),

    /// The document did not satisfy the schema it was bound to.
    #[error("document failed validation against {name} ({} violations)", .violations.len())]
    Validation {
        name: String,
        violations: Vec<ValidationError>,
    },

    /// The watcher could not be started.
    #[error("failed to start schema watcher: {0}")]
    Watch(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
