//! Identifier validation and tenant id sanitization

use std::fmt;

use thiserror::Error;

/// What kind of name was rejected, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Field,
    Collection,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Field => write!(f, "field"),
            IdentifierKind::Collection => write!(f, "collection"),
        }
    }
}

/// A name that failed the identifier rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} name: {name}. {hint}")]
pub struct IdentifierError {
    pub kind: IdentifierKind,
    pub name: String,
    hint: &'static str,
}

impl IdentifierError {
    fn field(name: &str) -> Self {
        Self {
            kind: IdentifierKind::Field,
            name: name.to_string(),
            hint: "Must start with a letter or underscore and contain only letters, numbers, and underscores",
        }
    }

    fn collection(name: &str) -> Self {
        Self {
            kind: IdentifierKind::Collection,
            name: name.to_string(),
            hint: "Must start with a letter and contain only letters, numbers, and underscores",
        }
    }

    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self.kind {
            IdentifierKind::Field => "IDENTIFIER_INVALID_FIELD",
            IdentifierKind::Collection => "IDENTIFIER_INVALID_COLLECTION",
        }
    }
}

/// Returns true if `name` matches `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn validate_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Collection names follow the identifier rule but may not start with `_`.
pub fn validate_collection_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_alphabetic()) && validate_identifier(name)
}

/// Returns the name unchanged if it is a valid field identifier.
pub fn sanitize_identifier(name: &str) -> Result<&str, IdentifierError> {
    if validate_identifier(name) {
        Ok(name)
    } else {
        Err(IdentifierError::field(name))
    }
}

/// Returns the name unchanged if it is a valid collection name.
pub fn sanitize_collection_name(name: &str) -> Result<&str, IdentifierError> {
    if validate_collection_name(name) {
        Ok(name)
    } else {
        Err(IdentifierError::collection(name))
    }
}

/// Returns true for the canonical `8-4-4-4-12` hex UUID layout (any case).
pub fn is_uuid(id: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let mut parts = id.split('-');
    for expected in GROUPS {
        match parts.next() {
            Some(part) if part.len() == expected && part.chars().all(|c| c.is_ascii_hexdigit()) => {}
            _ => return false,
        }
    }
    parts.next().is_none()
}

/// Cleans a tenant id.
///
/// UUIDs are returned as-is. Any other id has every character outside
/// `[a-zA-Z0-9_-]` removed; the id is never rejected, callers key storage
/// by the stripped form.
pub fn sanitize_tenant_id(id: &str) -> String {
    if is_uuid(id) {
        return id.to_string();
    }
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("name"));
        assert!(validate_identifier("_private"));
        assert!(validate_identifier("field_2"));
        assert!(validate_identifier("A"));
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(!validate_identifier(""));
        assert!(!validate_identifier("2fast"));
        assert!(!validate_identifier("has-dash"));
        assert!(!validate_identifier("has space"));
        assert!(!validate_identifier("drop;table"));
        assert!(!validate_identifier("naïve"));
    }

    #[test]
    fn test_collection_name_must_start_with_letter() {
        assert!(validate_collection_name("users"));
        assert!(validate_collection_name("blog_posts2"));
        assert!(!validate_collection_name("_users"));
        assert!(!validate_collection_name("1users"));
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("title").unwrap(), "title");

        let err = sanitize_identifier("bad name").unwrap_err();
        assert_eq!(err.kind, IdentifierKind::Field);
        assert!(err.to_string().contains("Invalid field name: bad name"));
    }

    #[test]
    fn test_sanitize_collection_name() {
        let err = sanitize_collection_name("_hidden").unwrap_err();
        assert_eq!(err.code(), "IDENTIFIER_INVALID_COLLECTION");
    }

    #[test]
    fn test_uuid_detection() {
        assert!(is_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_uuid("550E8400-E29B-41D4-A716-446655440000"));
        assert!(!is_uuid("550e8400-e29b-41d4-a716-44665544000"));
        assert!(!is_uuid("550e8400-e29b-41d4-a716-446655440000-00"));
        assert!(!is_uuid("550e8400e29b41d4a716446655440000"));
        assert!(!is_uuid("zzzzzzzz-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn test_sanitize_tenant_id_keeps_uuid() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(sanitize_tenant_id(id), id);
    }

    #[test]
    fn test_sanitize_tenant_id_strips_rather_than_rejects() {
        assert_eq!(sanitize_tenant_id("my-project_1"), "my-project_1");
        assert_eq!(sanitize_tenant_id("acme; DROP TABLE"), "acmeDROPTABLE");
        assert_eq!(sanitize_tenant_id("../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_tenant_id("!!!"), "");
    }
}
