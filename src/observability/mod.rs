//! Observability subsystem for tenantdb
//!
//! - Structured JSON logging with typed events
//! - Changelog records for every successful mutation
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes a request's outcome
//! 2. A failing sink is logged, never propagated
//! 3. Deterministic output (sorted keys, one line per event)
//!
//! # Usage
//!
//! ```ignore
//! use tenantdb::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::CollectionCreated, &[("tenant", "acme"), ("collection", "posts")]);
//! ```

mod audit;
mod events;
mod logger;

pub use audit::{
    AuditLog, ChangeAction, ChangeRecord, EntityType, FileAuditLog, MemoryAuditLog,
    DEFAULT_MEMORY_AUDIT_CAPACITY,
};
pub use events::Event;
pub use logger::{Logger, Severity};

fn severity_for(event: Event) -> Severity {
    if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a typed event
pub fn log_event(event: Event) {
    Logger::log(severity_for(event), event.as_str(), &[]);
}

/// Log a typed event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_for(event), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_event() {
        assert_eq!(severity_for(Event::AuditAppendFailed), Severity::Warn);
        assert_eq!(severity_for(Event::CollectionCreated), Severity::Info);
    }

    #[test]
    fn test_log_event() {
        // Only verifies no panic
        log_event(Event::ServerStart);
        log_event_with_fields(Event::ConfigLoaded, &[("path", "/tmp/tenantdb.json")]);
    }
}
