//! Changelog (audit) records
//!
//! - One record per successful collection or document mutation
//! - Append-only, one JSON object per line for the file-backed log
//! - A failed append never undoes the mutation it describes; the caller
//!   logs the failure and moves on

use std::collections::VecDeque;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of entity a changelog record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Collection,
    Document,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Collection => "collection",
            EntityType::Document => "document",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single changelog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub action: ChangeAction,
    /// What changed: the new state for creates/updates, the removed state
    /// for deletes
    pub changes: Value,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl ChangeRecord {
    /// Create a new changelog record stamped with the current time.
    pub fn new(
        tenant_id: impl Into<String>,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        action: ChangeAction,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tenant_id: tenant_id.into(),
            entity_type,
            entity_id: entity_id.into(),
            action,
            changes: Value::Null,
            actor: actor.into(),
            session: None,
        }
    }

    /// Set the change payload.
    pub fn with_changes(mut self, changes: Value) -> Self {
        self.changes = changes;
        self
    }

    /// Set the session that performed the change.
    pub fn with_session(mut self, session: Option<String>) -> Self {
        self.session = session;
        self
    }

    /// Serialize to a single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Changelog sink.
pub trait AuditLog: Send + Sync {
    /// Append a record. The record is visible once this returns `Ok`.
    fn append(&self, record: &ChangeRecord) -> io::Result<()>;

    /// Flush buffered records to durable storage.
    fn sync(&self) -> io::Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> io::Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit log lock poisoned"))
}

/// File-backed changelog: append-only, one JSON record per line, flushed
/// after every append.
pub struct FileAuditLog {
    path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl FileAuditLog {
    /// Open or create a changelog file.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, record: &ChangeRecord) -> io::Result<()> {
        let json = record.to_json()?;
        let mut writer = lock(&self.writer)?;
        writeln!(writer, "{}", json)?;
        writer.flush()
    }

    fn sync(&self) -> io::Result<()> {
        let mut writer = lock(&self.writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

/// Records kept by the server's in-memory changelog when no file is configured.
pub const DEFAULT_MEMORY_AUDIT_CAPACITY: usize = 1024;

/// In-memory changelog, used by tests and the default server wiring.
///
/// A bounded log drops its oldest record once full.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditLog {
    records: Arc<Mutex<VecDeque<ChangeRecord>>>,
    capacity: Option<usize>,
}

impl MemoryAuditLog {
    /// Unbounded log
    pub fn new() -> Self {
        Self::default()
    }

    /// Log holding at most `capacity` records (minimum 1)
    pub fn bounded(capacity: usize) -> Self {
        Self {
            records: Arc::default(),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Snapshot of retained entries, oldest first.
    pub fn records(&self) -> Vec<ChangeRecord> {
        lock(&self.records)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, record: &ChangeRecord) -> io::Result<()> {
        let mut records = lock(&self.records)?;
        if let Some(capacity) = self.capacity {
            while records.len() >= capacity {
                records.pop_front();
            }
        }
        records.push_back(record.clone());
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: AuditLog + ?Sized> AuditLog for Arc<T> {
    fn append(&self, record: &ChangeRecord) -> io::Result<()> {
        (**self).append(record)
    }

    fn sync(&self) -> io::Result<()> {
        (**self).sync()
    }
}

impl AuditLog for Box<dyn AuditLog> {
    fn append(&self, record: &ChangeRecord) -> io::Result<()> {
        (**self).append(record)
    }

    fn sync(&self) -> io::Result<()> {
        (**self).sync()
    }
}
