//! Collection schema subsystem for tenantdb
//!
//! Two validators guard every write:
//!
//! - [`validate_schema_definition`] runs when a collection is created or its
//!   field list replaced, and turns the raw field array into typed fields.
//! - [`DocumentValidator`] runs on every document create and update against
//!   the collection's *current* fields. Schema changes therefore apply to
//!   future writes only; stored documents are never re-validated.
//!
//! # Design Principles
//!
//! - Pure functions of their inputs, no I/O, no shared state
//! - Fail-fast: the first violation is returned
//! - Errors are values, never panics

mod definition;
mod document;
mod errors;
mod types;

pub use definition::validate_schema_definition;
pub use document::{parse_timestamp, validate_document, DocumentValidator, DEFAULT_REGEX_SIZE_LIMIT};
pub use errors::{DocumentError, DocumentResult, SchemaError, SchemaResult};
pub use types::{CollectionField, FieldType, FieldValidation};
