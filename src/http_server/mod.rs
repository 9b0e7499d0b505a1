//! # tenantdb HTTP Server Module
//!
//! Exposes the collection service as a REST API.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/projects/:tenant/collections` - List / create collections
//! - `/projects/:tenant/collections/:name` - Get / update / delete a collection
//! - `/projects/:tenant/collections/:name/documents` - Query / create documents
//! - `/projects/:tenant/collections/:name/documents/count` - Document count
//! - `/projects/:tenant/collections/:name/documents/bulk` - Bulk create (POST) / update (PUT)
//! - `/projects/:tenant/collections/:name/documents/bulk/delete` - Bulk delete
//! - `/projects/:tenant/collections/:name/documents/:id` - Get / update / delete a document
//!
//! Mutations read the acting user from `x-actor-id` and the session from
//! `x-session-id`.

pub mod collection_routes;
pub mod observability_routes;
pub mod server;

pub use collection_routes::{CollectionState, ErrorResponse, HttpCollectionService};
pub use server::HttpServer;
