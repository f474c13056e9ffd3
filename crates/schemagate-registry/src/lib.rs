//! Named, versioned schema registry with atomic hot reload.
//!
//! A [`Registry`] compiles every schema of a [`SchemaSource`] and publishes
//! them as one immutable [`Snapshot`]. Reloading recompiles what changed
//! and swaps the snapshot in a single step, so concurrent readers always see
//! either the old or the new set, never a mix.

pub mod config;
pub mod error;
pub mod registry;
pub mod snapshot;
pub mod source;
pub mod versioned;
pub mod watch;

#[cfg(test)]
mod test_support;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use registry::{Registry, ReloadOutcome};
pub use snapshot::{LoadFailure, LoadReport, Snapshot};
pub use source::{DirectorySource, MemorySource, SchemaSource, SourceEntry};
pub use versioned::VersionedRegistry;
pub use watch::WatchHandle;
