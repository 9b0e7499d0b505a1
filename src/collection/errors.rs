//! # Collection Service Errors
//!
//! Validation failures and orchestration outcomes, each mapped to the HTTP
//! status the edge should answer with.

use thiserror::Error;
use uuid::Uuid;

use crate::identifier::IdentifierError;
use crate::schema::{DocumentError, SchemaError};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors raised by a [`CollectionStore`](super::CollectionStore)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    /// Collections can only be removed once they hold no documents
    #[error("Collection {name} still contains {count} documents")]
    CollectionNotEmpty { name: String, count: usize },

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Duplicate value for unique field {field}: {value}")]
    UniqueViolation { field: String, value: String },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by the collection service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Tenant id was empty once sanitized
    #[error("Invalid tenant id: {0:?}")]
    InvalidTenant(String),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Invalid index {index}: {reason}")]
    InvalidIndex { index: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::InvalidTenant(_)
            | ServiceError::Identifier(_)
            | ServiceError::Schema(_)
            | ServiceError::Document(_)
            | ServiceError::InvalidIndex { .. } => 400,
            ServiceError::Store(err) => match err {
                StoreError::CollectionNotFound(_) | StoreError::DocumentNotFound(_) => 404,
                StoreError::CollectionExists(_)
                | StoreError::CollectionNotEmpty { .. }
                | StoreError::UniqueViolation { .. } => 409,
                StoreError::Unavailable(_) => 500,
            },
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidTenant(_) => "TENANT_INVALID",
            ServiceError::Identifier(err) => err.code(),
            ServiceError::Schema(err) => err.code(),
            ServiceError::Document(err) => err.code(),
            ServiceError::InvalidIndex { .. } => "COLLECTION_INVALID_INDEX",
            ServiceError::Store(err) => match err {
                StoreError::CollectionNotFound(_) => "COLLECTION_NOT_FOUND",
                StoreError::CollectionExists(_) => "COLLECTION_EXISTS",
                StoreError::CollectionNotEmpty { .. } => "COLLECTION_NOT_EMPTY",
                StoreError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
                StoreError::UniqueViolation { .. } => "DOCUMENT_UNIQUE_VIOLATION",
                StoreError::Unavailable(_) => "STORAGE_UNAVAILABLE",
            },
        }
    }

    /// True for errors caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
