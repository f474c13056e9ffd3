use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use schemagate_core::{CompiledSchema, ValidationError};

use crate::access::{resolve, DocumentAccess};

/// A JSON document with an optional schema it has been checked against.
///
/// The value is never handed out mutably, so once [`validate`] succeeds the
/// `validated` flag keeps describing the content it was set for. While it is
/// set, every required path of the bound schema resolves, and lookups of
/// those paths walk the pre-split key list instead of parsing the path.
///
/// [`validate`]: DynamicDocument::validate
#[derive(Debug, Clone)]
pub struct DynamicDocument {
    value: Value,
    schema: Option<Arc<CompiledSchema>>,
    validated: bool,
}

impl DynamicDocument {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            schema: None,
            validated: false,
        }
    }

    /// Bind `schema` without validating.
    pub fn bound(value: Value, schema: Arc<CompiledSchema>) -> Self {
        Self {
            value,
            schema: Some(schema),
            validated: false,
        }
    }

    /// Validate against `schema` and bind it.
    ///
    /// Sets the validated flag on success and clears it on failure.
    pub fn validate(
        &mut self,
        schema: &Arc<CompiledSchema>,
    ) -> std::result::Result<(), Vec<ValidationError>> {
        let violations = schema.validate(&self.value);
        self.schema = Some(Arc::clone(schema));
        self.validated = violations.is_empty();
        trace!(
            schema = schema.id(),
            violations = violations.len(),
            "document validated"
        );

        if self.validated {
            Ok(())
        } else {
            Err(violations)
        }
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    pub fn schema(&self) -> Option<&Arc<CompiledSchema>> {
        self.schema.as_ref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_inner(self) -> Value {
        self.value
    }

    /// Lookup through the required-path index; `None` when it does not apply.
    fn required_lookup(&self, path: &str) -> Option<Option<&Value>> {
        if !self.validated {
            return None;
        }
        let keys = self.schema.as_ref()?.required_path(path)?;
        Some(
            keys.iter()
                .try_fold(&self.value, |node, key| node.get(key.as_str())),
        )
    }
}

impl DocumentAccess for DynamicDocument {
    fn lookup(&self, path: &str) -> Option<&Value> {
        match self.required_lookup(path) {
            Some(found) => found,
            None => resolve(&self.value, path),
        }
    }
}

impl From<Value> for DynamicDocument {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use schemagate_core::{compile, SchemaDefinition};

    use super::*;

    fn schema() -> Arc<CompiledSchema> {
        Arc::new(
            compile(&SchemaDefinition::from_value(
                "order",
                json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "customer": {
                            "type": "object",
                            "properties": { "email": { "type": "string" } },
                            "required": ["email"]
                        }
                    },
                    "required": ["id", "customer"]
                }),
            ))
            .unwrap(),
        )
    }

    #[test]
    fn validate_sets_and_clears_flag() {
        let schema = schema();
        let mut document = DynamicDocument::new(json!({ "id": 1, "customer": { "email": "a@b" } }));
        assert!(!document.is_validated());

        document.validate(&schema).unwrap();
        assert!(document.is_validated());
        assert_eq!(document.get_string("customer.email"), Some("a@b"));
        assert_eq!(document.get_integer("id"), Some(1));

        let mut broken = DynamicDocument::bound(json!({ "id": "x" }), Arc::clone(&schema));
        let violations = broken.validate(&schema).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(!broken.is_validated());
        assert!(broken.schema().is_some());
        assert_eq!(broken.get_string("customer.email"), None);
    }

    #[test]
    fn non_required_paths_use_generic_resolution() {
        let schema = schema();
        let mut document = DynamicDocument::from(json!({
            "id": 7,
            "customer": { "email": "a@b", "tags": ["vip"] }
        }));
        document.validate(&schema).unwrap();

        assert_eq!(document.get_string("customer.tags[0]"), Some("vip"));
        assert_eq!(document.length("customer"), Some(2));
        assert!(!document.has("customer.phone"));
        assert_eq!(document.into_inner()["id"], json!(7));
    }
}
