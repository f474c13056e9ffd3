//! Structural schema compiler and accumulating validator.
//!
//! A schema definition is compiled once into an immutable constraint tree
//! and then evaluated against any number of JSON documents.
//!
//! - [`SchemaDefinition`]: raw schema text plus identity (id, version, hash)
//! - [`Compiler`]: resolves `$ref`s, rejects cycles and unknown keywords
//! - [`CompiledSchema`]: the published, fully resolved validator
//! - [`validate`]: reports every violation in one pass, never fail-fast
//!
//! Compile defects are [`CompileError`]s. Document defects are data:
//! a list of [`ValidationError`]s.

pub mod compiler;
pub mod definition;
pub mod error;
pub mod format;
pub mod node;
pub mod path;
pub mod schema;
pub mod validator;
pub mod violation;

mod refs;

pub use compiler::{compile, CompileOptions, Compiler};
pub use definition::{content_hash, SchemaDefinition, DEFAULT_VERSION};
pub use error::{CompileError, Result};
pub use format::Format;
pub use node::{
    AdditionalPolicy, ConstraintNode, JsonType, LengthBound, LengthKind, RangeBound, RangeKind,
};
pub use path::{InstancePath, PathSegment, SchemaPath};
pub use schema::CompiledSchema;
pub use validator::validate;
pub use violation::{ValidationError, ValidationErrorKind};
