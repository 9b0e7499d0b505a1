//! tenantdb - multi-tenant collection schema and document validation engine
//!
//! Layers, leaves first:
//! - `identifier`: name rules and tenant id sanitization
//! - `schema`: schema definition and document validation
//! - `query`: pagination and filter normalization
//! - `collection`: storage trait, in-memory store, orchestration service
//! - `observability`: structured logging and the changelog
//! - `http_server` / `cli`: outer surfaces

pub mod cli;
pub mod collection;
pub mod config;
pub mod http_server;
pub mod identifier;
pub mod observability;
pub mod query;
pub mod schema;
