//! Identifier sanitizer for tenantdb
//!
//! Collection names, field names and tenant ids flow into storage keys and
//! query plans, so they are checked here before anything else touches them.
//!
//! - Identifiers: `[a-zA-Z_][a-zA-Z0-9_]*`
//! - Collection names: identifier rule, and must start with a letter
//! - Tenant ids: UUIDs pass through, anything else is stripped to
//!   `[a-zA-Z0-9_-]` (sanitize, never reject)

mod sanitizer;

pub use sanitizer::{
    is_uuid, sanitize_collection_name, sanitize_identifier, sanitize_tenant_id,
    validate_collection_name, validate_identifier, IdentifierError, IdentifierKind,
};
