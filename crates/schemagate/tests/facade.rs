use std::sync::Arc;

use serde_json::json;

use schemagate::registry::{MemorySource, ReloadOutcome};
use schemagate::{DocumentAccess, Registry, RegistryConfig, ValidationErrorKind};

const ORDER_V1: &str = r#"{
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
}"#;

#[test]
fn bind_then_read_through_the_facade() {
    let registry = Registry::from_embedded(&[("order", ORDER_V1)]).unwrap();

    let document = registry
        .bind("order", json!({ "id": 9, "customer": { "email": "a@b.c" } }))
        .unwrap();
    assert!(document.is_validated());
    assert_eq!(document.get_string("customer.email"), Some("a@b.c"));
    assert_eq!(document.get_integer("id"), Some(9));

    let violations = registry.validate("order", &json!({ "id": 9 })).unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ValidationErrorKind::MissingRequired);
}

#[test]
fn memory_source_reload_publishes_new_form() {
    let source = Arc::new(MemorySource::new("facade"));
    source.insert("order", ORDER_V1);
    let registry = Registry::load(Arc::clone(&source), RegistryConfig::default()).unwrap();
    let order = json!({ "id": 1, "customer": { "email": "x" } });
    assert!(registry.is_valid("order", &order).unwrap());

    source.insert(
        "order",
        r#"{ "type": "object", "properties": { "id": { "type": "string" } } }"#,
    );
    let outcome = registry.reload().unwrap();
    assert!(matches!(outcome, ReloadOutcome::Published { generation: 2, .. }));
    assert!(registry.is_valid("order", &json!({ "id": "one" })).unwrap());
}
