//! Path-addressed typed access to JSON documents.
//!
//! Paths are dot-separated property names, each optionally followed by
//! bracketed array indices: `a.b[0].c`, `matrix[1][0]`.
//!
//! Every getter answers "is it there, and of this shape?". A missing
//! member, an out-of-range index, a kind mismatch, or a malformed path all
//! resolve to `None`; use [`AccessPath::parse`] when the distinction matters.

pub mod access;
pub mod document;
pub mod error;
pub mod path;

pub use access::{
    get_array, get_boolean, get_integer, get_number, get_object, get_string, has, length, resolve,
    DocumentAccess,
};
pub use document::DynamicDocument;
pub use error::{PathError, Result};
pub use path::{AccessPath, Segment};
