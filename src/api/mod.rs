//! HTTP API for the cron job inventory.
//!
//! Read-only endpoints over [`Aggregator`]: a health check, the full job
//! list, and single-job lookup by id.

mod errors;
mod handlers;
mod responses;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::ApiState;
pub use responses::*;

use axum::{Router, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::aggregator::Aggregator;

/// Configuration for the API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8565,
        }
    }
}

impl ApiConfig {
    /// Create a new API config with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, as printed in logs.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the API router with all endpoints.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/jobs", get(handlers::list_jobs))
        .route("/api/jobs/{job_id}", get(handlers::get_job))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Create the API state around an aggregator.
pub fn create_api_state(aggregator: Aggregator) -> ApiState {
    ApiState {
        aggregator: Arc::new(aggregator),
    }
}

/// Start the API server.
///
/// The server is spawned onto the runtime; the returned handle completes when
/// the server stops.
pub async fn start_server(
    config: &ApiConfig,
    state: ApiState,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let router = build_router(state);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!("API server listening on http://{}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}
