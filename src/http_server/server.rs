//! # HTTP Server
//!
//! Combines the health and collection routers behind one CORS layer.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::collection_routes::{collection_routes, CollectionState};
use super::observability_routes::health_routes;
use crate::config::EngineConfig;
use crate::observability::{
    log_event_with_fields, AuditLog, Event, FileAuditLog, MemoryAuditLog,
    DEFAULT_MEMORY_AUDIT_CAPACITY,
};

/// HTTP server for the collection API
pub struct HttpServer {
    config: EngineConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server from configuration, opening the changelog file if
    /// one is configured. Otherwise changes go to a bounded in-memory log.
    pub fn from_config(config: EngineConfig) -> io::Result<Self> {
        let audit: Box<dyn AuditLog> = match &config.audit_log_path {
            Some(path) => Box::new(FileAuditLog::open(path)?),
            None => Box::new(MemoryAuditLog::bounded(DEFAULT_MEMORY_AUDIT_CAPACITY)),
        };
        let state = Arc::new(CollectionState::new(audit, &config));
        Ok(Self::with_state(config, state))
    }

    /// Create a server around existing state
    pub fn with_state(config: EngineConfig, state: Arc<CollectionState>) -> Self {
        let router = Self::build_router(&config, state);
        Self { config, router }
    }

    fn build_router(config: &EngineConfig, state: Arc<CollectionState>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(health_routes())
            .merge(collection_routes(state))
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process exits
    pub async fn start(self) -> io::Result<()> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid socket address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        log_event_with_fields(Event::ServerStart, &[("addr", addr.to_string().as_str())]);
        axum::serve(listener, self.router).await
    }
}
