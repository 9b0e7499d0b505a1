//! Collections and documents
//!
//! - `store`: the persistence trait and the in-memory implementation
//! - `service`: validation, persistence and changelog orchestration
//! - `model`: records and request shapes

mod errors;
mod model;
mod service;
mod store;

pub use errors::{ServiceError, ServiceResult, StoreError, StoreResult};
pub use model::{
    Actor, BulkItemResult, BulkResult, BulkUpdateItem, Collection, CollectionIndex,
    CollectionUpdate, CreateCollectionRequest, Document, DocumentPage, NewCollection,
    UpdateCollectionRequest, METADATA_FIELDS,
};
pub use service::CollectionService;
pub use store::{CollectionStore, MemoryStore};
