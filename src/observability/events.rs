//! Observable events for tenantdb
//!
//! Events are explicit and typed; the string form is what appears in the
//! `event` key of every log line.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    ConfigLoaded,
    ServerStart,

    // Collections
    CollectionCreated,
    CollectionUpdated,
    CollectionDeleted,
    /// Name or schema definition rejected
    CollectionRejected,

    // Documents
    DocumentCreated,
    DocumentUpdated,
    DocumentDeleted,
    /// Data failed validation or a store constraint
    DocumentRejected,
    BulkCompleted,

    // Reads
    QueryExecuted,
    /// `page <= 0` produced a negative offset
    NegativeOffset,

    // Changelog
    AuditAppendFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ServerStart => "SERVER_START",
            Event::CollectionCreated => "COLLECTION_CREATED",
            Event::CollectionUpdated => "COLLECTION_UPDATED",
            Event::CollectionDeleted => "COLLECTION_DELETED",
            Event::CollectionRejected => "COLLECTION_REJECTED",
            Event::DocumentCreated => "DOCUMENT_CREATED",
            Event::DocumentUpdated => "DOCUMENT_UPDATED",
            Event::DocumentDeleted => "DOCUMENT_DELETED",
            Event::DocumentRejected => "DOCUMENT_REJECTED",
            Event::BulkCompleted => "BULK_COMPLETED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::NegativeOffset => "QUERY_NEGATIVE_OFFSET",
            Event::AuditAppendFailed => "AUDIT_APPEND_FAILED",
        }
    }

    /// Events that indicate a degraded path rather than normal traffic
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::NegativeOffset | Event::AuditAppendFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake() {
        for event in [Event::CollectionCreated, Event::DocumentRejected, Event::AuditAppendFailed] {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_warning_events() {
        assert!(Event::AuditAppendFailed.is_warning());
        assert!(!Event::DocumentCreated.is_warning());
    }
}
