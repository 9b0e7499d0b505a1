//! Schema and document validation errors
//!
//! Both kinds are client-input errors: they are returned, never panicked,
//! never retried, and map to a 4xx response at the HTTP edge.
//!
//! Codes:
//! - SCHEMA_* for rejected field definitions
//! - DOCUMENT_* for rejected document data

use thiserror::Error;

use super::types::FieldType;
use crate::identifier::IdentifierError;

/// A field array rejected by the schema definition validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The submitted fields value is not an array
    #[error("Fields must be an array")]
    NotAnArray,

    /// Entry is not an object or lacks a name or type
    #[error("Each field must have a name and type (field at index {index})")]
    IncompleteField { index: usize },

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error(transparent)]
    InvalidFieldName(#[from] IdentifierError),

    #[error("Invalid field type: {field_type}")]
    InvalidFieldType { field: String, field_type: String },

    /// Validation rules are malformed or contradictory
    #[error("Invalid validation for field {field}: {reason}")]
    InvalidConstraint { field: String, reason: String },
}

impl SchemaError {
    pub(crate) fn constraint(field: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidConstraint {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::NotAnArray => "SCHEMA_NOT_ARRAY",
            SchemaError::IncompleteField { .. } => "SCHEMA_FIELD_INCOMPLETE",
            SchemaError::DuplicateField(_) => "SCHEMA_DUPLICATE_FIELD",
            SchemaError::InvalidFieldName(_) => "SCHEMA_INVALID_FIELD_NAME",
            SchemaError::InvalidFieldType { .. } => "SCHEMA_INVALID_FIELD_TYPE",
            SchemaError::InvalidConstraint { .. } => "SCHEMA_INVALID_CONSTRAINT",
        }
    }

    /// The offending field name, when one is known
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaError::NotAnArray | SchemaError::IncompleteField { .. } => None,
            SchemaError::DuplicateField(name) => Some(name),
            SchemaError::InvalidFieldName(err) => Some(&err.name),
            SchemaError::InvalidFieldType { field, .. } => Some(field),
            SchemaError::InvalidConstraint { field, .. } => Some(field),
        }
    }
}

/// Document data rejected by the document validator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    #[error("Document data must be an object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Field {field} must be of type {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: &'static str,
    },

    #[error("Field {field} must be a finite number")]
    NonFiniteNumber { field: String },

    #[error("Field {field} must be a valid date")]
    InvalidDate { field: String },

    #[error("Field {field} must be at least {min} characters")]
    TooShort { field: String, min: u64 },

    #[error("Field {field} must be at most {max} characters")]
    TooLong { field: String, max: u64 },

    #[error("Field {field} does not match pattern {pattern}")]
    PatternMismatch { field: String, pattern: String },

    /// The stored pattern does not compile
    #[error("Field {field} has an invalid pattern {pattern}: {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("Field {field} must be at least {min}")]
    BelowMinimum { field: String, min: f64 },

    #[error("Field {field} must be at most {max}")]
    AboveMaximum { field: String, max: f64 },

    #[error("Field {field} must have at least {min} items")]
    TooFewItems { field: String, min: u64 },

    #[error("Field {field} must have at most {max} items")]
    TooManyItems { field: String, max: u64 },
}

impl DocumentError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DocumentError::NotAnObject => "DOCUMENT_NOT_OBJECT",
            DocumentError::MissingRequired(_) => "DOCUMENT_MISSING_FIELD",
            DocumentError::TypeMismatch { .. } => "DOCUMENT_TYPE_MISMATCH",
            DocumentError::NonFiniteNumber { .. } => "DOCUMENT_NON_FINITE_NUMBER",
            DocumentError::InvalidDate { .. } => "DOCUMENT_INVALID_DATE",
            DocumentError::TooShort { .. } | DocumentError::TooLong { .. } => "DOCUMENT_LENGTH",
            DocumentError::PatternMismatch { .. } => "DOCUMENT_PATTERN_MISMATCH",
            DocumentError::InvalidPattern { .. } => "DOCUMENT_INVALID_PATTERN",
            DocumentError::BelowMinimum { .. } | DocumentError::AboveMaximum { .. } => {
                "DOCUMENT_OUT_OF_RANGE"
            }
            DocumentError::TooFewItems { .. } | DocumentError::TooManyItems { .. } => {
                "DOCUMENT_ITEM_COUNT"
            }
        }
    }

    /// The offending field name, when one is known
    pub fn field(&self) -> Option<&str> {
        match self {
            DocumentError::NotAnObject => None,
            DocumentError::MissingRequired(field)
            | DocumentError::TypeMismatch { field, .. }
            | DocumentError::NonFiniteNumber { field }
            | DocumentError::InvalidDate { field }
            | DocumentError::TooShort { field, .. }
            | DocumentError::TooLong { field, .. }
            | DocumentError::PatternMismatch { field, .. }
            | DocumentError::InvalidPattern { field, .. }
            | DocumentError::BelowMinimum { field, .. }
            | DocumentError::AboveMaximum { field, .. }
            | DocumentError::TooFewItems { field, .. }
            | DocumentError::TooManyItems { field, .. } => Some(field),
        }
    }
}

/// Result type for schema definition validation
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for document validation
pub type DocumentResult<T> = Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        let err = SchemaError::DuplicateField("a".into());
        assert_eq!(err.to_string(), "Duplicate field name: a");
        assert_eq!(err.field(), Some("a"));

        let err = DocumentError::MissingRequired("email".into());
        assert_eq!(err.to_string(), "Missing required field: email");
        assert_eq!(err.code(), "DOCUMENT_MISSING_FIELD");
    }

    #[test]
    fn test_numeric_bounds_render_without_fraction() {
        let err = DocumentError::AboveMaximum {
            field: "age".into(),
            max: 120.0,
        };
        assert_eq!(err.to_string(), "Field age must be at most 120");

        let err = DocumentError::BelowMinimum {
            field: "ratio".into(),
            min: 0.5,
        };
        assert_eq!(err.to_string(), "Field ratio must be at least 0.5");
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = DocumentError::TypeMismatch {
            field: "active".into(),
            expected: FieldType::Boolean,
            actual: "string",
        };
        assert_eq!(
            err.to_string(),
            "Field active must be of type boolean, got string"
        );
    }

    #[test]
    fn test_incomplete_field_message() {
        let err = SchemaError::IncompleteField { index: 2 };
        assert!(err.to_string().contains("field must have a name and type"));
        assert_eq!(err.field(), None);
    }
}
