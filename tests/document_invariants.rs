//! Document Invariant Tests
//!
//! Document validation against a collection's field list:
//! - Required fields must be present
//! - Present declared fields must match type and constraints
//! - Undeclared keys are tolerated
//! - Validation is deterministic and never mutates the document
//! - Boundary constraints are inclusive

use serde_json::{json, Value};
use tenantdb::schema::{
    parse_timestamp, validate_document, validate_schema_definition, CollectionField,
    DocumentError, DocumentValidator,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn fields(definition: Value) -> Vec<CollectionField> {
    validate_schema_definition(&definition).unwrap()
}

fn error_message(definition: Value, document: Value) -> String {
    validate_document(&document, &fields(definition))
        .unwrap_err()
        .to_string()
}

// =============================================================================
// Reference Scenarios
// =============================================================================

#[test]
fn test_number_above_maximum() {
    let message = error_message(
        json!([{ "name": "age", "type": "number", "validation": { "min": 0, "max": 120 } }]),
        json!({ "age": 150 }),
    );
    assert!(message.contains("at most 120"), "{}", message);
}

#[test]
fn test_missing_required_field() {
    let message = error_message(
        json!([{ "name": "email", "type": "string", "required": true }]),
        json!({}),
    );
    assert!(message.contains("Missing required field: email"));
}

#[test]
fn test_too_few_array_items() {
    let message = error_message(
        json!([{ "name": "tags", "type": "array", "validation": { "minItems": 1, "maxItems": 5 } }]),
        json!({ "tags": [] }),
    );
    assert!(message.contains("at least 1 items"));
}

#[test]
fn test_extra_keys_tolerated() {
    let schema = fields(json!([{ "name": "active", "type": "boolean" }]));
    assert!(validate_document(&json!({ "active": true, "extra": "ignored" }), &schema).is_ok());
}

// =============================================================================
// Determinism and Purity
// =============================================================================

#[test]
fn test_validation_is_idempotent() {
    let schema = fields(json!([
        { "name": "title", "type": "string", "required": true, "validation": { "maxLength": 5 } }
    ]));
    let good = json!({ "title": "hey" });
    let bad = json!({ "title": "too long" });
    let good_before = good.clone();

    for _ in 0..20 {
        assert!(validate_document(&good, &schema).is_ok());
        assert_eq!(
            validate_document(&bad, &schema).unwrap_err(),
            DocumentError::TooLong {
                field: "title".into(),
                max: 5
            }
        );
    }
    assert_eq!(good, good_before);
}

#[test]
fn test_first_violation_in_field_order() {
    let schema = fields(json!([
        { "name": "a", "type": "string", "required": true },
        { "name": "b", "type": "number" }
    ]));
    let err = validate_document(&json!({ "b": "nope" }), &schema).unwrap_err();
    assert_eq!(err, DocumentError::MissingRequired("a".into()));
}

// =============================================================================
// Boundaries
// =============================================================================

#[test]
fn test_zero_length_bounds_accept_only_empty_string() {
    let schema = fields(json!([
        { "name": "s", "type": "string", "validation": { "minLength": 0, "maxLength": 0 } }
    ]));
    assert!(validate_document(&json!({ "s": "" }), &schema).is_ok());
    assert!(validate_document(&json!({ "s": "x" }), &schema).is_err());
}

#[test]
fn test_equal_number_bounds_accept_only_that_number() {
    let schema = fields(json!([
        { "name": "n", "type": "number", "validation": { "min": 7, "max": 7 } }
    ]));
    assert!(validate_document(&json!({ "n": 7 }), &schema).is_ok());
    assert!(validate_document(&json!({ "n": 7.0 }), &schema).is_ok());
    assert!(validate_document(&json!({ "n": 6.999 }), &schema).is_err());
    assert!(validate_document(&json!({ "n": 8 }), &schema).is_err());
}

#[test]
fn test_length_counts_characters() {
    let schema = fields(json!([
        { "name": "s", "type": "string", "validation": { "maxLength": 3 } }
    ]));
    assert!(validate_document(&json!({ "s": "héé" }), &schema).is_ok());
}

// =============================================================================
// Types
// =============================================================================

#[test]
fn test_type_mismatches() {
    let schema = fields(json!([
        { "name": "s", "type": "string" },
        { "name": "n", "type": "number" },
        { "name": "b", "type": "boolean" },
        { "name": "d", "type": "date" },
        { "name": "a", "type": "array" },
        { "name": "o", "type": "object" }
    ]));

    let cases = [
        ("s", json!(1)),
        ("n", json!("1")),
        ("b", json!("true")),
        ("d", json!(1700000000)),
        ("a", json!({})),
        ("o", json!([])),
        ("s", Value::Null),
    ];

    for (key, value) in cases {
        let mut doc = serde_json::Map::new();
        doc.insert(key.to_string(), value.clone());
        let err = validate_document(&Value::Object(doc), &schema).unwrap_err();
        assert_eq!(err.code(), "DOCUMENT_TYPE_MISMATCH", "{} = {}", key, value);
        assert_eq!(err.field(), Some(key));
    }
}

#[test]
fn test_dates() {
    let schema = fields(json!([{ "name": "d", "type": "date" }]));
    for ok in ["2024-03-01", "2024-03-01T10:00:00Z", "2024-03-01T10:00:00+02:00"] {
        assert!(validate_document(&json!({ "d": ok }), &schema).is_ok(), "{}", ok);
    }
    for bad in ["yesterday", "2024-02-30", ""] {
        let err = validate_document(&json!({ "d": bad }), &schema).unwrap_err();
        assert_eq!(err.code(), "DOCUMENT_INVALID_DATE", "{}", bad);
    }

    assert!(parse_timestamp("Tue, 1 Jul 2003 10:52:37 +0200").is_some());
}

#[test]
fn test_pattern() {
    let schema = fields(json!([
        { "name": "code", "type": "string", "validation": { "pattern": "^[A-Z]{3}$" } }
    ]));
    assert!(validate_document(&json!({ "code": "ABC" }), &schema).is_ok());

    let err = validate_document(&json!({ "code": "abcd" }), &schema).unwrap_err();
    assert_eq!(err.code(), "DOCUMENT_PATTERN_MISMATCH");
}

#[test]
fn test_unparseable_pattern_is_reported() {
    let schema = fields(json!([
        { "name": "code", "type": "string", "validation": { "pattern": "([a-z" } }
    ]));
    let err = validate_document(&json!({ "code": "abc" }), &schema).unwrap_err();
    assert_eq!(err.code(), "DOCUMENT_INVALID_PATTERN");
}

#[test]
fn test_non_object_document() {
    let schema = fields(json!([]));
    for doc in [json!([]), json!("x"), json!(null)] {
        assert_eq!(
            DocumentValidator::default().validate(&doc, &schema).unwrap_err(),
            DocumentError::NotAnObject
        );
    }
}
