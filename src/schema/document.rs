//! Document validator
//!
//! Validation semantics:
//! - Every required field is present
//! - Every present, declared field matches its type and constraints
//! - Undeclared keys are tolerated and passed through untouched
//! - `unique` is not checked here; the store owns uniqueness
//!
//! Validation is fail-fast in field-list order, does not mutate the
//! document, and is deterministic.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::RegexBuilder;
use serde_json::{Map, Value};

use super::errors::{DocumentError, DocumentResult};
use super::types::{CollectionField, FieldType, FieldValidation};

/// Default compiled-size ceiling for user supplied patterns (1 MiB).
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1024 * 1024;

/// Validates document data against a collection's field list.
#[derive(Debug, Clone, Copy)]
pub struct DocumentValidator {
    regex_size_limit: usize,
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self {
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

impl DocumentValidator {
    /// Creates a validator with a custom compiled-pattern size limit.
    pub fn with_regex_size_limit(regex_size_limit: usize) -> Self {
        Self { regex_size_limit }
    }

    /// Validates `data`, which must be a JSON object.
    pub fn validate(&self, data: &Value, fields: &[CollectionField]) -> DocumentResult<()> {
        let obj = data.as_object().ok_or(DocumentError::NotAnObject)?;
        self.validate_object(obj, fields)
    }

    /// Validates an already-unwrapped data map.
    pub fn validate_object(
        &self,
        data: &Map<String, Value>,
        fields: &[CollectionField],
    ) -> DocumentResult<()> {
        for field in fields {
            match data.get(&field.name) {
                Some(value) => self.validate_value(field, value)?,
                None if field.required => {
                    return Err(DocumentError::MissingRequired(field.name.clone()));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Checks one present value against a single field's type and rules.
    pub fn validate_value(&self, field: &CollectionField, value: &Value) -> DocumentResult<()> {
        let rules = field.validation.as_ref();

        match field.field_type {
            FieldType::String => {
                let s = value.as_str().ok_or_else(|| mismatch(field, value))?;
                if let Some(rules) = rules {
                    self.check_string(&field.name, s, rules)?;
                }
            }
            FieldType::Number => {
                let n = value.as_f64().ok_or_else(|| mismatch(field, value))?;
                if !n.is_finite() {
                    return Err(DocumentError::NonFiniteNumber {
                        field: field.name.clone(),
                    });
                }
                if let Some(rules) = rules {
                    check_range(&field.name, n, rules)?;
                }
            }
            FieldType::Boolean => {
                if !value.is_boolean() {
                    return Err(mismatch(field, value));
                }
            }
            FieldType::Date => {
                let s = value.as_str().ok_or_else(|| mismatch(field, value))?;
                if parse_timestamp(s).is_none() {
                    return Err(DocumentError::InvalidDate {
                        field: field.name.clone(),
                    });
                }
            }
            FieldType::Array => {
                let items = value.as_array().ok_or_else(|| mismatch(field, value))?;
                if let Some(rules) = rules {
                    check_items(&field.name, items.len() as u64, rules)?;
                }
            }
            FieldType::Object => {
                if !value.is_object() {
                    return Err(mismatch(field, value));
                }
            }
        }

        Ok(())
    }

    fn check_string(&self, field: &str, s: &str, rules: &FieldValidation) -> DocumentResult<()> {
        if let Some(pattern) = rules.pattern.as_deref() {
            let re = RegexBuilder::new(pattern)
                .size_limit(self.regex_size_limit)
                .build()
                .map_err(|e| DocumentError::InvalidPattern {
                    field: field.to_string(),
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
            if !re.is_match(s) {
                return Err(DocumentError::PatternMismatch {
                    field: field.to_string(),
                    pattern: pattern.to_string(),
                });
            }
        }

        let len = s.chars().count() as u64;
        if let Some(min) = rules.min_length {
            if len < min {
                return Err(DocumentError::TooShort {
                    field: field.to_string(),
                    min,
                });
            }
        }
        if let Some(max) = rules.max_length {
            if len > max {
                return Err(DocumentError::TooLong {
                    field: field.to_string(),
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Validates `data` against `fields` with default settings.
pub fn validate_document(data: &Value, fields: &[CollectionField]) -> DocumentResult<()> {
    DocumentValidator::default().validate(data, fields)
}

fn check_range(field: &str, n: f64, rules: &FieldValidation) -> DocumentResult<()> {
    if let Some(min) = rules.min {
        if n < min {
            return Err(DocumentError::BelowMinimum {
                field: field.to_string(),
                min,
            });
        }
    }
    if let Some(max) = rules.max {
        if n > max {
            return Err(DocumentError::AboveMaximum {
                field: field.to_string(),
                max,
            });
        }
    }
    Ok(())
}

fn check_items(field: &str, count: u64, rules: &FieldValidation) -> DocumentResult<()> {
    if let Some(min) = rules.min_items {
        if count < min {
            return Err(DocumentError::TooFewItems {
                field: field.to_string(),
                min,
            });
        }
    }
    if let Some(max) = rules.max_items {
        if count > max {
            return Err(DocumentError::TooManyItems {
                field: field.to_string(),
                max,
            });
        }
    }
    Ok(())
}

/// Parses the timestamp layouts accepted for `date` fields.
///
/// RFC 3339, RFC 2822, `YYYY-MM-DD`, and naive date-times with a `T` or
/// space separator (interpreted as UTC). Out-of-range calendar values such
/// as `2024-02-30` are rejected.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn mismatch(field: &CollectionField, value: &Value) -> DocumentError {
    DocumentError::TypeMismatch {
        field: field.name.clone(),
        expected: field.field_type,
        actual: json_type_name(value),
    }
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, t: FieldType) -> CollectionField {
        CollectionField::new(name, t)
    }

    #[test]
    fn test_age_above_maximum() {
        let fields = vec![field("age", FieldType::Number)
            .with_validation(FieldValidation::range(Some(0.0), Some(120.0)))];

        let err = validate_document(&json!({ "age": 150 }), &fields).unwrap_err();
        assert!(err.to_string().contains("at most 120"));
        assert_eq!(err.field(), Some("age"));
    }

    #[test]
    fn test_missing_required() {
        let fields = vec![field("email", FieldType::String).required()];
        let err = validate_document(&json!({}), &fields).unwrap_err();
        assert!(err.to_string().contains("Missing required field: email"));
    }

    #[test]
    fn test_optional_absent_field_passes() {
        let fields = vec![field("nickname", FieldType::String)];
        assert!(validate_document(&json!({}), &fields).is_ok());
    }

    #[test]
    fn test_empty_array_below_min_items() {
        let fields = vec![field("tags", FieldType::Array)
            .with_validation(FieldValidation::items(Some(1), Some(5)))];
        let err = validate_document(&json!({ "tags": [] }), &fields).unwrap_err();
        assert!(err.to_string().contains("at least 1 items"));

        let err =
            validate_document(&json!({ "tags": [1, 2, 3, 4, 5, 6] }), &fields).unwrap_err();
        assert!(err.to_string().contains("at most 5 items"));
    }

    #[test]
    fn test_array_elements_not_checked() {
        let fields = vec![field("mixed", FieldType::Array)];
        assert!(validate_document(&json!({ "mixed": [1, "two", null, {}] }), &fields).is_ok());
    }

    #[test]
    fn test_extra_keys_tolerated() {
        let fields = vec![field("active", FieldType::Boolean)];
        assert!(validate_document(&json!({ "active": true, "extra": "ignored" }), &fields).is_ok());
    }

    #[test]
    fn test_boolean_is_strict() {
        let fields = vec![field("active", FieldType::Boolean)];
        for value in [json!("true"), json!(1), json!(null)] {
            let err = validate_document(&json!({ "active": value }), &fields).unwrap_err();
            assert_eq!(err.code(), "DOCUMENT_TYPE_MISMATCH");
        }
    }

    #[test]
    fn test_number_rejects_numeric_strings() {
        let fields = vec![field("n", FieldType::Number)];
        let err = validate_document(&json!({ "n": "42" }), &fields).unwrap_err();
        assert_eq!(
            err,
            DocumentError::TypeMismatch {
                field: "n".into(),
                expected: FieldType::Number,
                actual: "string",
            }
        );
    }

    #[test]
    fn test_string_length_counts_characters() {
        let fields = vec![field("s", FieldType::String)
            .with_validation(FieldValidation::length(Some(2), Some(3)))];
        assert!(validate_document(&json!({ "s": "héé" }), &fields).is_ok());
        assert!(matches!(
            validate_document(&json!({ "s": "h" }), &fields),
            Err(DocumentError::TooShort { min: 2, .. })
        ));
        assert!(matches!(
            validate_document(&json!({ "s": "hello" }), &fields),
            Err(DocumentError::TooLong { max: 3, .. })
        ));
    }

    #[test]
    fn test_zero_length_bounds_accept_only_empty() {
        let fields = vec![field("s", FieldType::String)
            .with_validation(FieldValidation::length(Some(0), Some(0)))];
        assert!(validate_document(&json!({ "s": "" }), &fields).is_ok());
        assert!(validate_document(&json!({ "s": "x" }), &fields).is_err());
    }

    #[test]
    fn test_equal_bounds_accept_only_that_number() {
        let fields = vec![field("n", FieldType::Number)
            .with_validation(FieldValidation::range(Some(7.0), Some(7.0)))];
        assert!(validate_document(&json!({ "n": 7 }), &fields).is_ok());
        assert!(validate_document(&json!({ "n": 7.0 }), &fields).is_ok());
        assert!(validate_document(&json!({ "n": 6.999 }), &fields).is_err());
        assert!(validate_document(&json!({ "n": 8 }), &fields).is_err());
    }

    #[test]
    fn test_pattern() {
        let fields = vec![field("sku", FieldType::String)
            .with_validation(FieldValidation::pattern("^[A-Z]{3}-[0-9]+$"))];
        assert!(validate_document(&json!({ "sku": "ABC-12" }), &fields).is_ok());

        let err = validate_document(&json!({ "sku": "abc-12" }), &fields).unwrap_err();
        assert_eq!(err.code(), "DOCUMENT_PATTERN_MISMATCH");
    }

    #[test]
    fn test_bad_pattern_is_an_error_not_a_panic() {
        let fields = vec![field("s", FieldType::String)
            .with_validation(FieldValidation::pattern("([unclosed"))];
        let err = validate_document(&json!({ "s": "x" }), &fields).unwrap_err();
        assert_eq!(err.code(), "DOCUMENT_INVALID_PATTERN");
    }

    #[test]
    fn test_pattern_size_limit() {
        let fields = vec![field("s", FieldType::String)
            .with_validation(FieldValidation::pattern("(?:a{1000}){1000}"))];
        let validator = DocumentValidator::with_regex_size_limit(1024);
        let err = validator.validate(&json!({ "s": "a" }), &fields).unwrap_err();
        assert_eq!(err.code(), "DOCUMENT_INVALID_PATTERN");
    }

    #[test]
    fn test_dates() {
        let fields = vec![field("when", FieldType::Date)];
        for ok in [
            "2024-03-01",
            "2024-03-01T10:20:30Z",
            "2024-03-01T10:20:30.123+02:00",
            "2024-03-01 10:20:30",
            "2024-03-01T10:20",
            "Fri, 01 Mar 2024 10:20:30 GMT",
        ] {
            assert!(validate_document(&json!({ "when": ok }), &fields).is_ok(), "{}", ok);
        }
        for bad in ["", "yesterday", "2024-02-30", "2024-13-01"] {
            let err = validate_document(&json!({ "when": bad }), &fields).unwrap_err();
            assert_eq!(err.code(), "DOCUMENT_INVALID_DATE", "{}", bad);
        }
        let err = validate_document(&json!({ "when": 1709288430 }), &fields).unwrap_err();
        assert_eq!(err.code(), "DOCUMENT_TYPE_MISMATCH");
    }

    #[test]
    fn test_object_rejects_arrays_and_null() {
        let fields = vec![field("meta", FieldType::Object)];
        assert!(validate_document(&json!({ "meta": { "k": 1 } }), &fields).is_ok());
        assert!(validate_document(&json!({ "meta": [] }), &fields).is_err());
        assert!(validate_document(&json!({ "meta": null }), &fields).is_err());
    }

    #[test]
    fn test_non_object_document() {
        let err = validate_document(&json!([1, 2]), &[]).unwrap_err();
        assert_eq!(err, DocumentError::NotAnObject);
    }

    #[test]
    fn test_first_offending_field_wins() {
        let fields = vec![
            field("a", FieldType::String).required(),
            field("b", FieldType::Number).required(),
        ];
        let err = validate_document(&json!({ "b": "x" }), &fields).unwrap_err();
        assert_eq!(err.field(), Some("a"));
    }

    #[test]
    fn test_unique_is_not_enforced() {
        let fields = vec![field("slug", FieldType::String).unique()];
        assert!(validate_document(&json!({ "slug": "same" }), &fields).is_ok());
        assert!(validate_document(&json!({ "slug": "same" }), &fields).is_ok());
    }
}
