//! Collection HTTP Routes
//!
//! Endpoints for collection management and document CRUD, scoped per
//! tenant under `/projects/:tenant`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::collection::{
    Actor, BulkResult, BulkUpdateItem, Collection, CollectionService, CreateCollectionRequest,
    Document, DocumentPage, MemoryStore, ServiceError, UpdateCollectionRequest,
};
use crate::config::EngineConfig;
use crate::observability::AuditLog;

/// Header carrying the acting user's id
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Header carrying the acting session's id
pub const SESSION_HEADER: &str = "x-session-id";

// ==================
// Shared State
// ==================

/// Service type served over HTTP
pub type HttpCollectionService = CollectionService<MemoryStore, Box<dyn AuditLog>>;

/// Collection state shared across handlers
pub struct CollectionState {
    pub service: HttpCollectionService,
}

impl CollectionState {
    pub fn new(audit: Box<dyn AuditLog>, config: &EngineConfig) -> Self {
        Self {
            service: CollectionService::from_config(MemoryStore::new(), audit, config),
        }
    }
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Serialize)]
pub struct CollectionsListResponse {
    pub collections: Vec<Collection>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DocumentCountResponse {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub documents: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub updates: Vec<BulkUpdateItem>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        Self {
            error: err.to_string(),
            code: err.status_code(),
        }
    }
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

// ==================
// Collection Routes
// ==================

/// Create collection routes
pub fn collection_routes(state: Arc<CollectionState>) -> Router {
    Router::new()
        .route(
            "/projects/:tenant/collections",
            get(list_collections_handler).post(create_collection_handler),
        )
        .route(
            "/projects/:tenant/collections/:name",
            get(get_collection_handler)
                .put(update_collection_handler)
                .delete(delete_collection_handler),
        )
        .route(
            "/projects/:tenant/collections/:name/documents",
            get(list_documents_handler).post(create_document_handler),
        )
        .route(
            "/projects/:tenant/collections/:name/documents/count",
            get(count_documents_handler),
        )
        .route(
            "/projects/:tenant/collections/:name/documents/bulk",
            post(bulk_create_handler).put(bulk_update_handler),
        )
        .route(
            "/projects/:tenant/collections/:name/documents/bulk/delete",
            post(bulk_delete_handler),
        )
        .route(
            "/projects/:tenant/collections/:name/documents/:id",
            get(get_document_handler)
                .put(update_document_handler)
                .delete(delete_document_handler),
        )
        .with_state(state)
}

// ==================
// Helper Functions
// ==================

/// Actor from the identity headers; anonymous requests act as `system`
fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut actor = header(ACTOR_HEADER).map(Actor::new).unwrap_or_else(Actor::system);
    actor.session = header(SESSION_HEADER);
    actor
}

fn error_response(err: ServiceError) -> HandlerError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err)))
}

// ==================
// Collection Handlers
// ==================

async fn list_collections_handler(
    State(state): State<Arc<CollectionState>>,
    Path(tenant): Path<String>,
) -> Result<Json<CollectionsListResponse>, HandlerError> {
    let collections = state
        .service
        .list_collections(&tenant)
        .map_err(error_response)?;

    Ok(Json(CollectionsListResponse {
        total: collections.len(),
        collections,
    }))
}

async fn create_collection_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path(tenant): Path<String>,
    Json(request): Json<CreateCollectionRequest>,
) -> Result<(StatusCode, Json<Collection>), HandlerError> {
    let actor = actor_from_headers(&headers);
    let collection = state
        .service
        .create_collection(&tenant, request, &actor)
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(collection)))
}

async fn get_collection_handler(
    State(state): State<Arc<CollectionState>>,
    Path((tenant, name)): Path<(String, String)>,
) -> Result<Json<Collection>, HandlerError> {
    state
        .service
        .get_collection(&tenant, &name)
        .map(Json)
        .map_err(error_response)
}

async fn update_collection_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path((tenant, name)): Path<(String, String)>,
    Json(request): Json<UpdateCollectionRequest>,
) -> Result<Json<Collection>, HandlerError> {
    let actor = actor_from_headers(&headers);
    state
        .service
        .update_collection(&tenant, &name, request, &actor)
        .map(Json)
        .map_err(error_response)
}

async fn delete_collection_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path((tenant, name)): Path<(String, String)>,
) -> Result<StatusCode, HandlerError> {
    let actor = actor_from_headers(&headers);
    state
        .service
        .delete_collection(&tenant, &name, &actor)
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

// ==================
// Document Handlers
// ==================

async fn list_documents_handler(
    State(state): State<Arc<CollectionState>>,
    Path((tenant, name)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<DocumentPage>, HandlerError> {
    state
        .service
        .list_documents(&tenant, &name, &params)
        .map(Json)
        .map_err(error_response)
}

async fn count_documents_handler(
    State(state): State<Arc<CollectionState>>,
    Path((tenant, name)): Path<(String, String)>,
) -> Result<Json<DocumentCountResponse>, HandlerError> {
    let count = state
        .service
        .count_documents(&tenant, &name)
        .map_err(error_response)?;

    Ok(Json(DocumentCountResponse { count }))
}

async fn create_document_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path((tenant, name)): Path<(String, String)>,
    Json(data): Json<Value>,
) -> Result<(StatusCode, Json<Document>), HandlerError> {
    let actor = actor_from_headers(&headers);
    let document = state
        .service
        .create_document(&tenant, &name, data, &actor)
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(document)))
}

async fn get_document_handler(
    State(state): State<Arc<CollectionState>>,
    Path((tenant, name, id)): Path<(String, String, Uuid)>,
) -> Result<Json<Document>, HandlerError> {
    state
        .service
        .get_document(&tenant, &name, id)
        .map(Json)
        .map_err(error_response)
}

async fn update_document_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path((tenant, name, id)): Path<(String, String, Uuid)>,
    Json(patch): Json<Value>,
) -> Result<Json<Document>, HandlerError> {
    let actor = actor_from_headers(&headers);
    state
        .service
        .update_document(&tenant, &name, id, patch, &actor)
        .map(Json)
        .map_err(error_response)
}

async fn delete_document_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path((tenant, name, id)): Path<(String, String, Uuid)>,
) -> Result<StatusCode, HandlerError> {
    let actor = actor_from_headers(&headers);
    state
        .service
        .delete_document(&tenant, &name, id, &actor)
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

// ==================
// Bulk Handlers
// ==================

async fn bulk_create_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path((tenant, name)): Path<(String, String)>,
    Json(request): Json<BulkCreateRequest>,
) -> Result<Json<BulkResult>, HandlerError> {
    let actor = actor_from_headers(&headers);
    state
        .service
        .bulk_create(&tenant, &name, request.documents, &actor)
        .map(Json)
        .map_err(error_response)
}

async fn bulk_update_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path((tenant, name)): Path<(String, String)>,
    Json(request): Json<BulkUpdateRequest>,
) -> Result<Json<BulkResult>, HandlerError> {
    let actor = actor_from_headers(&headers);
    state
        .service
        .bulk_update(&tenant, &name, request.updates, &actor)
        .map(Json)
        .map_err(error_response)
}

async fn bulk_delete_handler(
    State(state): State<Arc<CollectionState>>,
    headers: HeaderMap,
    Path((tenant, name)): Path<(String, String)>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<BulkResult>, HandlerError> {
    let actor = actor_from_headers(&headers);
    state
        .service
        .bulk_delete(&tenant, &name, request.ids, &actor)
        .map(Json)
        .map_err(error_response)
}
