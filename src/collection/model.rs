//! Collection and document records, plus the request shapes the service
//! accepts before validation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::schema::CollectionField;

/// Document attributes that live outside `data`.
pub const METADATA_FIELDS: [&str; 5] = ["id", "created_at", "updated_at", "created_by", "updated_by"];

/// Secondary index declared on a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionIndex {
    pub name: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl CollectionIndex {
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A tenant-scoped, schema-declaring group of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<CollectionField>,
    #[serde(default)]
    pub indexes: Vec<CollectionIndex>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

/// A record belonging to a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub tenant_id: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl Document {
    /// Resolves a metadata attribute or a data key.
    ///
    /// Timestamps render as fixed-width RFC 3339 so their string order is
    /// chronological.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(Value::String(self.id.to_string())),
            "created_at" => Some(Value::String(timestamp(&self.created_at))),
            "updated_at" => Some(Value::String(timestamp(&self.updated_at))),
            "created_by" => Some(Value::String(self.created_by.clone())),
            "updated_by" => Some(Value::String(self.updated_by.clone())),
            _ => self.data.get(key).cloned(),
        }
    }
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Validated input for creating a collection
#[derive(Debug, Clone, PartialEq)]
pub struct NewCollection {
    pub description: Option<String>,
    pub fields: Vec<CollectionField>,
    pub indexes: Vec<CollectionIndex>,
}

/// Validated changes to an existing collection; `None` leaves a part as is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionUpdate {
    pub description: Option<String>,
    pub fields: Option<Vec<CollectionField>>,
    pub indexes: Option<Vec<CollectionIndex>>,
}

/// Raw create-collection request; `fields` is validated before use
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_fields")]
    pub fields: Value,
    #[serde(default)]
    pub indexes: Vec<CollectionIndex>,
}

fn empty_fields() -> Value {
    Value::Array(Vec::new())
}

/// Raw update-collection request
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateCollectionRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<Value>,
    #[serde(default)]
    pub indexes: Option<Vec<CollectionIndex>>,
}

/// Who performs a mutation, for `created_by`/`updated_by` and the changelog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub session: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Actor used when a request carries no identity
    pub fn system() -> Self {
        Self::new("system")
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    /// Matching documents across all pages
    pub total: usize,
    pub limit: i64,
    pub offset: i64,
}

/// Outcome of one item in a bulk operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItemResult {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Aggregated bulk outcome; failed items never abort their siblings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkResult {
    pub results: Vec<BulkItemResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkResult {
    pub fn from_items(results: Vec<BulkItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
        }
    }
}

/// One entry of a bulk update
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BulkUpdateItem {
    pub id: Uuid,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(data: Value) -> Document {
        let now = Utc::now();
        Document {
            id: Uuid::new_v4(),
            collection_id: Uuid::new_v4(),
            tenant_id: "acme".into(),
            data: data.as_object().cloned().unwrap_or_default(),
            created_at: now,
            created_by: "u1".into(),
            updated_at: now,
            updated_by: "u1".into(),
        }
    }

    #[test]
    fn test_lookup_metadata_and_data() {
        let d = doc(json!({ "title": "hi", "id": "shadowed" }));
        assert_eq!(d.lookup("title"), Some(json!("hi")));
        assert_eq!(d.lookup("id"), Some(Value::String(d.id.to_string())));
        assert_eq!(d.lookup("created_by"), Some(json!("u1")));
        assert_eq!(d.lookup("missing"), None);
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateCollectionRequest = serde_json::from_value(json!({ "name": "posts" })).unwrap();
        assert_eq!(req.fields, json!([]));
        assert!(req.indexes.is_empty());
    }

    #[test]
    fn test_bulk_result_counts() {
        let item = |index, success| BulkItemResult {
            index,
            success,
            id: None,
            error: None,
            code: None,
        };
        let result = BulkResult::from_items(vec![item(0, true), item(1, false), item(2, true)]);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
    }
}
