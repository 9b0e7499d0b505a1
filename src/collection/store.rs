//! # Collection Store
//!
//! The persistence collaborator. The service only calls a store after
//! validation succeeds, so a store trusts its inputs' shape but still owns
//! the constraints that need a view of every document: uniqueness and the
//! empty-before-delete rule.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::model::{Collection, CollectionUpdate, Document, DocumentPage, NewCollection};
use crate::query::{QueryOptions, SortOrder};

/// Storage operations consumed by the collection service
pub trait CollectionStore: Send + Sync {
    fn get_collection(&self, tenant_id: &str, name: &str) -> StoreResult<Option<Collection>>;

    /// All collections of a tenant, ordered by name
    fn list_collections(&self, tenant_id: &str) -> StoreResult<Vec<Collection>>;

    fn create_collection(
        &self,
        tenant_id: &str,
        name: &str,
        collection: NewCollection,
        actor_id: &str,
    ) -> StoreResult<Collection>;

    fn update_collection(
        &self,
        tenant_id: &str,
        name: &str,
        update: CollectionUpdate,
    ) -> StoreResult<Collection>;

    /// Fails with `CollectionNotEmpty` while documents remain
    fn delete_collection(&self, tenant_id: &str, name: &str) -> StoreResult<()>;

    fn count_documents(&self, tenant_id: &str, name: &str) -> StoreResult<usize>;

    fn get_documents(
        &self,
        tenant_id: &str,
        name: &str,
        query: &QueryOptions,
    ) -> StoreResult<DocumentPage>;

    fn get_document(&self, tenant_id: &str, name: &str, id: Uuid) -> StoreResult<Option<Document>>;

    fn create_document(
        &self,
        tenant_id: &str,
        name: &str,
        data: Map<String, Value>,
        actor_id: &str,
    ) -> StoreResult<Document>;

    /// Replaces the document's data wholesale
    fn update_document(
        &self,
        tenant_id: &str,
        name: &str,
        id: Uuid,
        data: Map<String, Value>,
        actor_id: &str,
    ) -> StoreResult<Document>;

    /// Removes and returns the document
    fn delete_document(&self, tenant_id: &str, name: &str, id: Uuid) -> StoreResult<Document>;
}

type CollectionKey = (String, String);

#[derive(Debug)]
struct CollectionEntry {
    collection: Collection,
    /// Insertion order, so equal sort keys keep a stable order
    documents: Vec<Document>,
}

/// In-memory store keyed by `(tenant, collection name)`.
///
/// Enforces `unique` fields and unique indexes across the collection's
/// documents.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<CollectionKey, CollectionEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<CollectionKey, CollectionEntry>>> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("collection lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<CollectionKey, CollectionEntry>>> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("collection lock poisoned".into()))
    }
}

fn key(tenant_id: &str, name: &str) -> CollectionKey {
    (tenant_id.to_string(), name.to_string())
}

impl CollectionStore for MemoryStore {
    fn get_collection(&self, tenant_id: &str, name: &str) -> StoreResult<Option<Collection>> {
        Ok(self
            .read()?
            .get(&key(tenant_id, name))
            .map(|entry| entry.collection.clone()))
    }

    fn list_collections(&self, tenant_id: &str) -> StoreResult<Vec<Collection>> {
        let mut collections: Vec<Collection> = self
            .read()?
            .iter()
            .filter(|((tenant, _), _)| tenant == tenant_id)
            .map(|(_, entry)| entry.collection.clone())
            .collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(collections)
    }

    fn create_collection(
        &self,
        tenant_id: &str,
        name: &str,
        collection: NewCollection,
        actor_id: &str,
    ) -> StoreResult<Collection> {
        let mut collections = self.write()?;
        let k = key(tenant_id, name);
        if collections.contains_key(&k) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }

        let now = Utc::now();
        let created = Collection {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            description: collection.description,
            fields: collection.fields,
            indexes: collection.indexes,
            created_at: now,
            updated_at: now,
            created_by: actor_id.to_string(),
        };
        collections.insert(
            k,
            CollectionEntry {
                collection: created.clone(),
                documents: Vec::new(),
            },
        );
        Ok(created)
    }

    fn update_collection(
        &self,
        tenant_id: &str,
        name: &str,
        update: CollectionUpdate,
    ) -> StoreResult<Collection> {
        let mut collections = self.write()?;
        let entry = collections
            .get_mut(&key(tenant_id, name))
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        let collection = &mut entry.collection;
        if let Some(description) = update.description {
            collection.description = Some(description);
        }
        if let Some(fields) = update.fields {
            collection.fields = fields;
        }
        if let Some(indexes) = update.indexes {
            collection.indexes = indexes;
        }
        collection.updated_at = Utc::now();
        Ok(collection.clone())
    }

    fn delete_collection(&self, tenant_id: &str, name: &str) -> StoreResult<()> {
        let mut collections = self.write()?;
        let k = key(tenant_id, name);
        let count = collections
            .get(&k)
            .map(|entry| entry.documents.len())
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;
        if count > 0 {
            return Err(StoreError::CollectionNotEmpty {
                name: name.to_string(),
                count,
            });
        }
        collections.remove(&k);
        Ok(())
    }

    fn count_documents(&self, tenant_id: &str, name: &str) -> StoreResult<usize> {
        self.read()?
            .get(&key(tenant_id, name))
            .map(|entry| entry.documents.len())
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn get_documents(
        &self,
        tenant_id: &str,
        name: &str,
        query: &QueryOptions,
    ) -> StoreResult<DocumentPage> {
        let collections = self.read()?;
        let entry = collections
            .get(&key(tenant_id, name))
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        let mut matched: Vec<(Option<Value>, &Document)> = entry
            .documents
            .iter()
            .filter(|doc| matches_filters(doc, query))
            .map(|doc| (doc.lookup(&query.order_by), doc))
            .collect();
        let total = matched.len();

        matched.sort_by(|(a, _), (b, _)| compare_sort_keys(a.as_ref(), b.as_ref(), query.order));

        let limit = usize::try_from(query.limit).unwrap_or(0);
        let documents = matched
            .into_iter()
            .skip(query.skip())
            .take(limit)
            .map(|(_, doc)| doc.clone())
            .collect();

        Ok(DocumentPage {
            documents,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    fn get_document(&self, tenant_id: &str, name: &str, id: Uuid) -> StoreResult<Option<Document>> {
        let collections = self.read()?;
        let entry = collections
            .get(&key(tenant_id, name))
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;
        Ok(entry.documents.iter().find(|d| d.id == id).cloned())
    }

    fn create_document(
        &self,
        tenant_id: &str,
        name: &str,
        data: Map<String, Value>,
        actor_id: &str,
    ) -> StoreResult<Document> {
        let mut collections = self.write()?;
        let entry = collections
            .get_mut(&key(tenant_id, name))
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        check_unique(entry, &data, None)?;

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            collection_id: entry.collection.id,
            tenant_id: tenant_id.to_string(),
            data,
            created_at: now,
            created_by: actor_id.to_string(),
            updated_at: now,
            updated_by: actor_id.to_string(),
        };
        entry.documents.push(document.clone());
        Ok(document)
    }

    fn update_document(
        &self,
        tenant_id: &str,
        name: &str,
        id: Uuid,
        data: Map<String, Value>,
        actor_id: &str,
    ) -> StoreResult<Document> {
        let mut collections = self.write()?;
        let entry = collections
            .get_mut(&key(tenant_id, name))
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        check_unique(entry, &data, Some(id))?;

        let document = entry
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::DocumentNotFound(id))?;
        document.data = data;
        document.updated_at = Utc::now();
        document.updated_by = actor_id.to_string();
        Ok(document.clone())
    }

    fn delete_document(&self, tenant_id: &str, name: &str, id: Uuid) -> StoreResult<Document> {
        let mut collections = self.write()?;
        let entry = collections
            .get_mut(&key(tenant_id, name))
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

        let position = entry
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or(StoreError::DocumentNotFound(id))?;
        Ok(entry.documents.remove(position))
    }
}

/// Rejects `data` if a unique field or unique index would collide with
/// another document. `exclude` is the document being updated.
fn check_unique(
    entry: &CollectionEntry,
    data: &Map<String, Value>,
    exclude: Option<Uuid>,
) -> StoreResult<()> {
    let others = || entry.documents.iter().filter(move |d| Some(d.id) != exclude);

    for field in entry.collection.fields.iter().filter(|f| f.unique) {
        let value = match data.get(&field.name) {
            Some(v) if !v.is_null() => v,
            _ => continue,
        };
        if others().any(|d| d.data.get(&field.name) == Some(value)) {
            return Err(StoreError::UniqueViolation {
                field: field.name.clone(),
                value: render(value),
            });
        }
    }

    for index in entry.collection.indexes.iter().filter(|i| i.unique) {
        let tuple: Vec<Option<&Value>> = index.fields.iter().map(|f| data.get(f)).collect();
        // Documents missing part of the key do not participate
        if tuple.iter().any(|v| v.map_or(true, Value::is_null)) {
            continue;
        }
        let collides = others().any(|d| {
            index
                .fields
                .iter()
                .zip(&tuple)
                .all(|(f, v)| d.data.get(f) == *v)
        });
        if collides {
            let value = tuple
                .iter()
                .flatten()
                .map(|v| render(v))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(StoreError::UniqueViolation {
                field: index.fields.join(", "),
                value,
            });
        }
    }

    Ok(())
}

/// Equality filters arrive uncoerced from the query string, so a string
/// filter also matches a non-string value with the same rendering
/// (`age=30` matches the number 30).
fn matches_filters(doc: &Document, query: &QueryOptions) -> bool {
    query.equality_filters.iter().all(|(field, expected)| {
        match (doc.lookup(field), expected) {
            (Some(actual), _) if &actual == expected => true,
            (Some(actual), Value::String(s)) if !actual.is_string() => actual.to_string() == *s,
            _ => false,
        }
    })
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Orders by the sort key; documents without one sort last in both
/// directions.
fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    let ordering = match (a, b) {
        (Some(a), Some(b)) => compare_values(a, b),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => return Ordering::Equal,
    };
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Total order over JSON values: values of different types order by type
/// rank (null, bool, number, string, array, object), then by content.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&b.as_f64().unwrap_or(0.0)),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(a), Value::Object(b)) => a.len().cmp(&b.len()).then_with(|| {
            a.iter()
                .zip(b)
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        }),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
