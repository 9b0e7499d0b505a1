//! Schema definition validator
//!
//! Checks a proposed field array before a collection is created or its
//! schema replaced. Works on the raw JSON value so malformed entries produce
//! a precise error instead of a generic deserialization failure, and returns
//! the typed field list once every entry passes.
//!
//! Validation is fail-fast: the first violation in array order is reported.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::document::DocumentValidator;
use super::errors::{SchemaError, SchemaResult};
use super::types::{CollectionField, FieldType, FieldValidation};
use crate::identifier::sanitize_identifier;

/// Validates a field array and returns the typed fields.
///
/// # Errors
///
/// Returns the first `SchemaError` found, walking entries in order:
/// missing name/type, duplicate name, invalid identifier, unknown type,
/// malformed validation rules, a default the field itself would reject.
pub fn validate_schema_definition(fields: &Value) -> SchemaResult<Vec<CollectionField>> {
    let entries = fields.as_array().ok_or(SchemaError::NotAnArray)?;

    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());
    let mut parsed = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let obj = entry
            .as_object()
            .ok_or(SchemaError::IncompleteField { index })?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty());
        let type_value = obj.get("type").filter(|t| !t.is_null());

        let (name, type_value) = match (name, type_value) {
            (Some(name), Some(type_value)) => (name, type_value),
            _ => return Err(SchemaError::IncompleteField { index }),
        };

        if !seen.insert(name) {
            return Err(SchemaError::DuplicateField(name.to_string()));
        }

        sanitize_identifier(name)?;

        let field_type = type_value
            .as_str()
            .and_then(FieldType::from_name)
            .ok_or_else(|| SchemaError::InvalidFieldType {
                field: name.to_string(),
                field_type: match type_value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            })?;

        let validation = match obj.get("validation") {
            None | Some(Value::Null) => None,
            Some(raw) => validate_rules(name, field_type, raw)?,
        };

        let field = CollectionField {
            name: name.to_string(),
            field_type,
            required: flag(obj, "required"),
            unique: flag(obj, "unique"),
            indexed: flag(obj, "indexed"),
            default: obj.get("default").filter(|v| !v.is_null()).cloned(),
            validation,
        };

        // Defaults must pass their own field
        if let Some(default) = &field.default {
            DocumentValidator::default()
                .validate_value(&field, default)
                .map_err(|e| SchemaError::constraint(name, format!("default is invalid: {}", e)))?;
        }

        parsed.push(field);
    }

    Ok(parsed)
}

/// Checks the rule shape for the field's type and parses it.
///
/// Rules attached to boolean, date and object fields carry no constraints
/// the validators read, so they are accepted without inspection.
fn validate_rules(
    field: &str,
    field_type: FieldType,
    raw: &Value,
) -> SchemaResult<Option<FieldValidation>> {
    if matches!(field_type, FieldType::Boolean | FieldType::Date | FieldType::Object) {
        return Ok(serde_json::from_value(raw.clone()).ok());
    }

    let rules = raw
        .as_object()
        .ok_or_else(|| SchemaError::constraint(field, "validation must be an object"))?;

    match field_type {
        FieldType::String => {
            let min = non_negative(field, rules, "minLength")?;
            let max = non_negative(field, rules, "maxLength")?;
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(SchemaError::constraint(
                        field,
                        format!("minLength ({}) cannot exceed maxLength ({})", min, max),
                    ));
                }
            }
            if let Some(pattern) = rules.get("pattern").filter(|p| !p.is_null()) {
                if !pattern.is_string() {
                    return Err(SchemaError::constraint(field, "pattern must be a string"));
                }
            }
        }
        FieldType::Number => {
            let min = number(field, rules, "min")?;
            let max = number(field, rules, "max")?;
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(SchemaError::constraint(
                        field,
                        format!("min ({}) cannot exceed max ({})", min, max),
                    ));
                }
            }
        }
        FieldType::Array => {
            let min = non_negative(field, rules, "minItems")?;
            let max = non_negative(field, rules, "maxItems")?;
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(SchemaError::constraint(
                        field,
                        format!("minItems ({}) cannot exceed maxItems ({})", min, max),
                    ));
                }
            }
        }
        FieldType::Boolean | FieldType::Date | FieldType::Object => {}
    }

    serde_json::from_value(raw.clone())
        .map(Some)
        .map_err(|e| SchemaError::constraint(field, e.to_string()))
}

fn non_negative(field: &str, rules: &Map<String, Value>, key: &str) -> SchemaResult<Option<u64>> {
    match rules.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                Ok(Some(v))
            } else if n.as_f64().map_or(false, |v| v < 0.0) {
                Err(SchemaError::constraint(field, format!("{} must be >= 0", key)))
            } else {
                Err(SchemaError::constraint(
                    field,
                    format!("{} must be a whole number", key),
                ))
            }
        }
        Some(_) => Err(SchemaError::constraint(
            field,
            format!("{} must be a number", key),
        )),
    }
}

fn number(field: &str, rules: &Map<String, Value>, key: &str) -> SchemaResult<Option<f64>> {
    match rules.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            SchemaError::constraint(field, format!("{} must be a number", key))
        }),
    }
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}
