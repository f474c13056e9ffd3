//! Schema-driven validation and dynamic document access.
//!
//! One structural schema serves as contract, validator and accessor guide.
//!
//! # Crate Structure
//!
//! - [`schema`]: schema compilation and accumulating validation
//! - [`access`]: dotted/indexed path lookups and [`access::DynamicDocument`]
//! - [`registry`]: named, versioned schema registry with atomic hot reload
//!
//! The most used types are also re-exported at the crate root.

/// Re-export compiler and validator types.
pub mod schema {
    pub use schemagate_core::*;
}

/// Re-export accessor types.
pub mod access {
    pub use schemagate_access::*;
}

/// Re-export registry types.
pub mod registry {
    pub use schemagate_registry::*;
}

pub use schemagate_access::{DocumentAccess, DynamicDocument};
pub use schemagate_core::{
    compile, CompileError, CompiledSchema, Compiler, SchemaDefinition, ValidationError,
    ValidationErrorKind,
};
pub use schemagate_registry::{Registry, RegistryConfig, RegistryError, VersionedRegistry};
