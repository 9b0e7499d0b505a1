//! # Collection Service
//!
//! Orchestrates every mutation as: sanitize names, validate input, persist,
//! then append a changelog record.
//!
//! Nothing reaches the store until validation passes. The changelog is
//! written after the store confirms the mutation; an append failure is
//! logged at WARN and the mutation stands.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{ServiceError, ServiceResult, StoreError};
use super::model::{
    Actor, BulkItemResult, BulkResult, BulkUpdateItem, Collection, CollectionIndex,
    CollectionUpdate, CreateCollectionRequest, Document, DocumentPage, NewCollection,
    UpdateCollectionRequest, METADATA_FIELDS,
};
use super::store::CollectionStore;
use crate::config::EngineConfig;
use crate::identifier::{sanitize_collection_name, sanitize_tenant_id, validate_identifier};
use crate::observability::{
    log_event_with_fields, AuditLog, ChangeAction, ChangeRecord, EntityType, Event,
};
use crate::query::{QueryDefaults, QueryOptions};
use crate::schema::{validate_schema_definition, CollectionField, DocumentError, DocumentValidator};

/// Collection and document operations over an injected store and changelog
pub struct CollectionService<S, A> {
    store: S,
    audit: A,
    validator: DocumentValidator,
    query_defaults: QueryDefaults,
}

impl<S: CollectionStore, A: AuditLog> CollectionService<S, A> {
    pub fn new(store: S, audit: A) -> Self {
        Self {
            store,
            audit,
            validator: DocumentValidator::default(),
            query_defaults: QueryDefaults::default(),
        }
    }

    /// Service with query defaults and regex limits taken from `config`
    pub fn from_config(store: S, audit: A, config: &EngineConfig) -> Self {
        Self::new(store, audit)
            .with_validator(DocumentValidator::with_regex_size_limit(config.regex_size_limit))
            .with_query_defaults(config.query_defaults())
    }

    pub fn with_validator(mut self, validator: DocumentValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_query_defaults(mut self, defaults: QueryDefaults) -> Self {
        self.query_defaults = defaults;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    // ==================
    // Collections
    // ==================

    pub fn create_collection(
        &self,
        tenant_id: &str,
        request: CreateCollectionRequest,
        actor: &Actor,
    ) -> ServiceResult<Collection> {
        let tenant = tenant(tenant_id)?;

        let prepared = sanitize_collection_name(&request.name)
            .map_err(ServiceError::from)
            .and_then(|name| {
                let fields = validate_schema_definition(&request.fields)?;
                validate_indexes(&request.indexes, &fields)?;
                Ok((name, fields))
            });
        let (name, fields) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => return Err(reject_collection(&tenant, &request.name, err)),
        };

        let collection = self.store.create_collection(
            &tenant,
            name,
            NewCollection {
                description: request.description,
                fields,
                indexes: request.indexes,
            },
            &actor.id,
        )?;

        log_event_with_fields(
            Event::CollectionCreated,
            &[("tenant", tenant.as_str()), ("collection", collection.name.as_str())],
        );
        self.record(
            ChangeRecord::new(
                &tenant,
                EntityType::Collection,
                collection.id.to_string(),
                ChangeAction::Create,
                &actor.id,
            )
            .with_changes(to_value(&collection))
            .with_session(actor.session.clone()),
        );
        Ok(collection)
    }

    pub fn get_collection(&self, tenant_id: &str, name: &str) -> ServiceResult<Collection> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        self.load_collection(&tenant, name)
    }

    pub fn list_collections(&self, tenant_id: &str) -> ServiceResult<Vec<Collection>> {
        let tenant = tenant(tenant_id)?;
        Ok(self.store.list_collections(&tenant)?)
    }

    /// Applies a partial update. A new field array is validated with the
    /// same rules as on create; existing documents are not re-validated.
    pub fn update_collection(
        &self,
        tenant_id: &str,
        name: &str,
        request: UpdateCollectionRequest,
        actor: &Actor,
    ) -> ServiceResult<Collection> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let current = self.load_collection(&tenant, name)?;

        let update = match prepare_update(&current, request) {
            Ok(update) => update,
            Err(err) => return Err(reject_collection(&tenant, name, err)),
        };
        let changes = collection_update_changes(&update);

        let updated = self.store.update_collection(&tenant, name, update)?;

        log_event_with_fields(
            Event::CollectionUpdated,
            &[("tenant", tenant.as_str()), ("collection", name)],
        );
        self.record(
            ChangeRecord::new(
                &tenant,
                EntityType::Collection,
                updated.id.to_string(),
                ChangeAction::Update,
                &actor.id,
            )
            .with_changes(changes)
            .with_session(actor.session.clone()),
        );
        Ok(updated)
    }

    /// Deletes a collection that holds no documents
    pub fn delete_collection(&self, tenant_id: &str, name: &str, actor: &Actor) -> ServiceResult<()> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let collection = self.load_collection(&tenant, name)?;

        self.store.delete_collection(&tenant, name)?;

        log_event_with_fields(
            Event::CollectionDeleted,
            &[("tenant", tenant.as_str()), ("collection", name)],
        );
        self.record(
            ChangeRecord::new(
                &tenant,
                EntityType::Collection,
                collection.id.to_string(),
                ChangeAction::Delete,
                &actor.id,
            )
            .with_changes(to_value(&collection))
            .with_session(actor.session.clone()),
        );
        Ok(())
    }

    // ==================
    // Documents
    // ==================

    /// Normalizes raw query parameters and returns one page of documents
    pub fn list_documents(
        &self,
        tenant_id: &str,
        name: &str,
        params: &HashMap<String, String>,
    ) -> ServiceResult<DocumentPage> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let query = QueryOptions::normalize_with(params, &self.query_defaults);

        if query.offset < 0 {
            log_event_with_fields(
                Event::NegativeOffset,
                &[
                    ("tenant", tenant.as_str()),
                    ("collection", name),
                    ("offset", query.offset.to_string().as_str()),
                ],
            );
        }

        let page = self.store.get_documents(&tenant, name, &query)?;
        log_event_with_fields(
            Event::QueryExecuted,
            &[
                ("tenant", tenant.as_str()),
                ("collection", name),
                ("returned", page.documents.len().to_string().as_str()),
                ("total", page.total.to_string().as_str()),
            ],
        );
        Ok(page)
    }

    pub fn count_documents(&self, tenant_id: &str, name: &str) -> ServiceResult<usize> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        Ok(self.store.count_documents(&tenant, name)?)
    }

    pub fn get_document(&self, tenant_id: &str, name: &str, id: Uuid) -> ServiceResult<Document> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        self.store
            .get_document(&tenant, name, id)?
            .ok_or_else(|| StoreError::DocumentNotFound(id).into())
    }

    /// Validates `data` against the collection's current fields, after
    /// filling declared defaults for absent keys, and stores it.
    pub fn create_document(
        &self,
        tenant_id: &str,
        name: &str,
        data: Value,
        actor: &Actor,
    ) -> ServiceResult<Document> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let collection = self.load_collection(&tenant, name)?;
        self.insert_document(&collection, data, actor)
    }

    /// Merges `patch` over the stored data and validates the merged result
    pub fn update_document(
        &self,
        tenant_id: &str,
        name: &str,
        id: Uuid,
        patch: Value,
        actor: &Actor,
    ) -> ServiceResult<Document> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let collection = self.load_collection(&tenant, name)?;
        self.patch_document(&collection, id, patch, actor)
    }

    pub fn delete_document(
        &self,
        tenant_id: &str,
        name: &str,
        id: Uuid,
        actor: &Actor,
    ) -> ServiceResult<Document> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let collection = self.load_collection(&tenant, name)?;
        self.remove_document(&collection, id, actor)
    }

    // ==================
    // Bulk
    // ==================

    /// Creates each item independently; failures never abort siblings
    pub fn bulk_create(
        &self,
        tenant_id: &str,
        name: &str,
        items: Vec<Value>,
        actor: &Actor,
    ) -> ServiceResult<BulkResult> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let collection = self.load_collection(&tenant, name)?;

        let results = items
            .into_iter()
            .enumerate()
            .map(|(index, data)| {
                bulk_item(index, self.insert_document(&collection, data, actor).map(|d| d.id))
            })
            .collect();
        Ok(self.finish_bulk(&collection, "create", results))
    }

    pub fn bulk_update(
        &self,
        tenant_id: &str,
        name: &str,
        items: Vec<BulkUpdateItem>,
        actor: &Actor,
    ) -> ServiceResult<BulkResult> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let collection = self.load_collection(&tenant, name)?;

        let results = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let outcome = self
                    .patch_document(&collection, item.id, item.data, actor)
                    .map(|d| d.id);
                bulk_item(index, outcome)
            })
            .collect();
        Ok(self.finish_bulk(&collection, "update", results))
    }

    pub fn bulk_delete(
        &self,
        tenant_id: &str,
        name: &str,
        ids: Vec<Uuid>,
        actor: &Actor,
    ) -> ServiceResult<BulkResult> {
        let tenant = tenant(tenant_id)?;
        let name = sanitize_collection_name(name)?;
        let collection = self.load_collection(&tenant, name)?;

        let results = ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                bulk_item(index, self.remove_document(&collection, id, actor).map(|d| d.id))
            })
            .collect();
        Ok(self.finish_bulk(&collection, "delete", results))
    }

    // ==================
    // Internals
    // ==================

    fn load_collection(&self, tenant: &str, name: &str) -> ServiceResult<Collection> {
        self.store
            .get_collection(tenant, name)?
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()).into())
    }

    fn insert_document(
        &self,
        collection: &Collection,
        data: Value,
        actor: &Actor,
    ) -> ServiceResult<Document> {
        let mut data = match data {
            Value::Object(map) => map,
            _ => return Err(self.reject_document(collection, DocumentError::NotAnObject.into())),
        };
        apply_defaults(&mut data, &collection.fields);

        if let Err(err) = self.validator.validate_object(&data, &collection.fields) {
            return Err(self.reject_document(collection, err.into()));
        }

        let document = self
            .store
            .create_document(&collection.tenant_id, &collection.name, data, &actor.id)
            .map_err(|err| self.reject_document(collection, err.into()))?;

        self.log_document(Event::DocumentCreated, collection, document.id);
        self.record(
            document_record(collection, document.id, ChangeAction::Create, actor)
                .with_changes(Value::Object(document.data.clone())),
        );
        Ok(document)
    }

    fn patch_document(
        &self,
        collection: &Collection,
        id: Uuid,
        patch: Value,
        actor: &Actor,
    ) -> ServiceResult<Document> {
        let patch = match patch {
            Value::Object(map) => map,
            _ => return Err(self.reject_document(collection, DocumentError::NotAnObject.into())),
        };

        let existing = self
            .store
            .get_document(&collection.tenant_id, &collection.name, id)?
            .ok_or(StoreError::DocumentNotFound(id))?;

        let mut merged = existing.data;
        for (key, value) in &patch {
            merged.insert(key.clone(), value.clone());
        }

        if let Err(err) = self.validator.validate_object(&merged, &collection.fields) {
            return Err(self.reject_document(collection, err.into()));
        }

        let document = self
            .store
            .update_document(&collection.tenant_id, &collection.name, id, merged, &actor.id)
            .map_err(|err| self.reject_document(collection, err.into()))?;

        self.log_document(Event::DocumentUpdated, collection, id);
        self.record(
            document_record(collection, id, ChangeAction::Update, actor)
                .with_changes(Value::Object(patch)),
        );
        Ok(document)
    }

    fn remove_document(
        &self,
        collection: &Collection,
        id: Uuid,
        actor: &Actor,
    ) -> ServiceResult<Document> {
        let document = self
            .store
            .delete_document(&collection.tenant_id, &collection.name, id)?;

        self.log_document(Event::DocumentDeleted, collection, id);
        self.record(
            document_record(collection, id, ChangeAction::Delete, actor)
                .with_changes(Value::Object(document.data.clone())),
        );
        Ok(document)
    }

    fn finish_bulk(
        &self,
        collection: &Collection,
        operation: &str,
        results: Vec<BulkItemResult>,
    ) -> BulkResult {
        let result = BulkResult::from_items(results);
        log_event_with_fields(
            Event::BulkCompleted,
            &[
                ("tenant", collection.tenant_id.as_str()),
                ("collection", collection.name.as_str()),
                ("operation", operation),
                ("succeeded", result.succeeded.to_string().as_str()),
                ("failed", result.failed.to_string().as_str()),
            ],
        );
        result
    }

    fn reject_document(&self, collection: &Collection, err: ServiceError) -> ServiceError {
        log_event_with_fields(
            Event::DocumentRejected,
            &[
                ("tenant", collection.tenant_id.as_str()),
                ("collection", collection.name.as_str()),
                ("code", err.code()),
                ("error", err.to_string().as_str()),
            ],
        );
        err
    }

    fn log_document(&self, event: Event, collection: &Collection, id: Uuid) {
        log_event_with_fields(
            event,
            &[
                ("tenant", collection.tenant_id.as_str()),
                ("collection", collection.name.as_str()),
                ("document", id.to_string().as_str()),
            ],
        );
    }

    /// Appends to the changelog. Failures are logged, never returned.
    fn record(&self, record: ChangeRecord) {
        if let Err(err) = self.audit.append(&record) {
            log_event_with_fields(
                Event::AuditAppendFailed,
                &[
                    ("tenant", record.tenant_id.as_str()),
                    ("entity_type", record.entity_type.as_str()),
                    ("entity_id", record.entity_id.as_str()),
                    ("action", record.action.as_str()),
                    ("error", err.to_string().as_str()),
                ],
            );
        }
    }
}

fn tenant(tenant_id: &str) -> ServiceResult<String> {
    let tenant = sanitize_tenant_id(tenant_id);
    if tenant.is_empty() {
        return Err(ServiceError::InvalidTenant(tenant_id.to_string()));
    }
    Ok(tenant)
}

fn reject_collection(tenant: &str, name: &str, err: ServiceError) -> ServiceError {
    log_event_with_fields(
        Event::CollectionRejected,
        &[
            ("tenant", tenant),
            ("collection", name),
            ("code", err.code()),
            ("error", err.to_string().as_str()),
        ],
    );
    err
}

fn prepare_update(
    current: &Collection,
    request: UpdateCollectionRequest,
) -> ServiceResult<CollectionUpdate> {
    let fields = request
        .fields
        .as_ref()
        .map(validate_schema_definition)
        .transpose()?;

    // A new field list can orphan existing indexes, so check whichever
    // index list will be in effect against whichever fields will be.
    if fields.is_some() || request.indexes.is_some() {
        let effective_fields = fields.as_deref().unwrap_or(&current.fields);
        let effective_indexes = request.indexes.as_deref().unwrap_or(&current.indexes);
        validate_indexes(effective_indexes, effective_fields)?;
    }

    Ok(CollectionUpdate {
        description: request.description,
        fields,
        indexes: request.indexes,
    })
}

/// Index names must be identifiers and distinct; every indexed key must be
/// a declared field or a document metadata attribute.
fn validate_indexes(indexes: &[CollectionIndex], fields: &[CollectionField]) -> ServiceResult<()> {
    let declared: HashSet<&str> = fields
        .iter()
        .map(|f| f.name.as_str())
        .chain(METADATA_FIELDS)
        .collect();
    let mut names = HashSet::new();

    for index in indexes {
        let invalid = |reason: String| ServiceError::InvalidIndex {
            index: index.name.clone(),
            reason,
        };

        if !validate_identifier(&index.name) {
            return Err(invalid("index name must be a valid identifier".into()));
        }
        if !names.insert(index.name.as_str()) {
            return Err(invalid("duplicate index name".into()));
        }
        if index.fields.is_empty() {
            return Err(invalid("index must cover at least one field".into()));
        }
        if let Some(unknown) = index.fields.iter().find(|f| !declared.contains(f.as_str())) {
            return Err(invalid(format!("unknown field {}", unknown)));
        }
    }
    Ok(())
}

fn apply_defaults(data: &mut Map<String, Value>, fields: &[CollectionField]) {
    for field in fields {
        if let Some(default) = &field.default {
            if !data.contains_key(&field.name) {
                data.insert(field.name.clone(), default.clone());
            }
        }
    }
}

fn collection_update_changes(update: &CollectionUpdate) -> Value {
    let mut changes = Map::new();
    if let Some(description) = &update.description {
        changes.insert("description".into(), Value::String(description.clone()));
    }
    if let Some(fields) = &update.fields {
        changes.insert("fields".into(), to_value(fields));
    }
    if let Some(indexes) = &update.indexes {
        changes.insert("indexes".into(), to_value(indexes));
    }
    Value::Object(changes)
}

fn document_record(
    collection: &Collection,
    id: Uuid,
    action: ChangeAction,
    actor: &Actor,
) -> ChangeRecord {
    ChangeRecord::new(
        &collection.tenant_id,
        EntityType::Document,
        id.to_string(),
        action,
        &actor.id,
    )
    .with_session(actor.session.clone())
}

fn bulk_item(index: usize, outcome: ServiceResult<Uuid>) -> BulkItemResult {
    match outcome {
        Ok(id) => BulkItemResult {
            index,
            success: true,
            id: Some(id),
            error: None,
            code: None,
        },
        Err(err) => BulkItemResult {
            index,
            success: false,
            id: None,
            error: Some(err.to_string()),
            code: Some(err.code()),
        },
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
