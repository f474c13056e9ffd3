use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CompileError, Result};

/// Version label used when neither the schema nor its source declares one.
pub const DEFAULT_VERSION: &str = "unversioned";

/// Raw structural schema as read from its source. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    id: String,
    version: String,
    raw: Value,
    origin: String,
    content_hash: String,
}

impl SchemaDefinition {
    /// Parse a definition from JSON text.
    ///
    /// `name` is the fallback identifier when the schema has no `$id`, and
    /// the initial origin. The content hash covers the exact source bytes.
    pub fn from_json(name: &str, text: &str) -> Result<Self> {
        let raw: Value =
            serde_json::from_str(text).map_err(|err| CompileError::InvalidJson(err.to_string()))?;
        let mut definition = Self::from_value(name, raw);
        definition.content_hash = content_hash(text.as_bytes());
        Ok(definition)
    }

    /// Build a definition from an in-memory value. The content hash covers
    /// the value's compact JSON serialization.
    pub fn from_value(name: &str, raw: Value) -> Self {
        let id = raw
            .get("$id")
            .and_then(Value::as_str)
            .unwrap_or(name)
            .to_string();
        let version = raw
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VERSION)
            .to_string();
        let content_hash = content_hash(raw.to_string().as_bytes());

        Self {
            id,
            version,
            raw,
            origin: name.to_string(),
            content_hash,
        }
    }

    /// Record where the definition was read from (a file path, a label).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Use `label` as the version unless the schema declares its own.
    pub fn with_default_version(mut self, label: &str) -> Self {
        if self.raw.get("version").and_then(Value::as_str).is_none() {
            self.version = label.to_string();
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Lowercase hex SHA-256 of the source content.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Root `required` names, in declaration order.
    pub fn required(&self) -> Vec<&str> {
        self.raw
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Root `properties` names, in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        self.raw
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| properties.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Root `examples` documents.
    pub fn examples(&self) -> &[Value] {
        self.raw
            .get("examples")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
