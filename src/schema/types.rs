//! Collection field type definitions
//!
//! Supported types:
//! - string: UTF-8 string, optional length bounds and regex pattern
//! - number: finite number, optional min/max
//! - boolean
//! - date: string holding a calendar timestamp
//! - array: any sequence, optional item-count bounds
//! - object: keyed structure

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Closed set of field types a collection may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Object,
}

impl FieldType {
    /// Every declarable type, in wire-name order.
    pub const ALL: [FieldType; 6] = [
        FieldType::String,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::Array,
        FieldType::Object,
    ];

    /// Returns the wire name for this type
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    /// Parses a wire name. Matching is exact (lowercase).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.type_name() == name)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Per-field constraint rules.
///
/// Which keys apply depends on the field type: `minLength`, `maxLength` and
/// `pattern` for strings, `min`/`max` for numbers, `minItems`/`maxItems` for
/// arrays. Keys that do not apply to the owning type are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
}

impl FieldValidation {
    /// String length bounds
    pub fn length(min: Option<u64>, max: Option<u64>) -> Self {
        Self {
            min_length: min,
            max_length: max,
            ..Self::default()
        }
    }

    /// Numeric range
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    /// Array item-count bounds
    pub fn items(min: Option<u64>, max: Option<u64>) -> Self {
        Self {
            min_items: min,
            max_items: max,
            ..Self::default()
        }
    }

    /// Regex the whole string value must match
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }
}

/// A named, typed attribute of a collection schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Declared only; enforced by the store, never by the validators.
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
}

impl CollectionField {
    /// Create an optional field with no constraints
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            unique: false,
            indexed: false,
            default: None,
            validation: None,
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the field as indexed
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Set the value used when a new document omits this field
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Attach constraint rules
    pub fn with_validation(mut self, validation: FieldValidation) -> Self {
        self.validation = Some(validation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_names_roundtrip() {
        for t in FieldType::ALL {
            assert_eq!(FieldType::from_name(t.type_name()), Some(t));
        }
        assert_eq!(FieldType::from_name("int"), None);
        assert_eq!(FieldType::from_name("String"), None);
    }

    #[test]
    fn test_field_wire_format() {
        let field = CollectionField::new("title", FieldType::String)
            .required()
            .with_validation(FieldValidation::length(Some(1), Some(80)));

        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "title",
                "type": "string",
                "required": true,
                "unique": false,
                "indexed": false,
                "validation": { "minLength": 1, "maxLength": 80 }
            })
        );
    }

    #[test]
    fn test_field_flags_default_to_false() {
        let field: CollectionField =
            serde_json::from_value(json!({ "name": "n", "type": "number" })).unwrap();
        assert!(!field.required);
        assert!(!field.unique);
        assert!(!field.indexed);
        assert!(field.validation.is_none());
    }
}
