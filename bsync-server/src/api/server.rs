//! HTTP server setup and routing
//!
//! Sets up the axum router for room streams, participant requests and status reports.

use super::{handlers, sse};
use crate::error::{Error, Result};
use crate::registry::RoomRegistry;
use axum::{
    routing::{get, post},
    Router,
};
use bsync_common::config::ServerConfig;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<RoomRegistry>,
}

impl AppContext {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }
}

/// Build the application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(handlers::health))

        // Participant stream (SSE) and requests
        .route("/api/rooms/:room_id/events", get(sse::event_stream))
        .route("/api/rooms/:room_id/messages", post(handlers::post_message))

        // Queue inspection and ingestion status reports
        .route("/api/rooms/:room_id/queue", get(handlers::get_queue))
        .route("/api/rooms/:room_id/entries/status", post(handlers::report_status))

        .with_state(ctx)
        .layer(TraceLayer::new_for_http())

        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}

/// Run the HTTP server until `shutdown` resolves
pub async fn run<F>(config: &ServerConfig, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("Starting HTTP server on {}", addr);

    serve(listener, ctx, shutdown).await
}

/// Serve on an already bound listener
pub async fn serve<F>(listener: TcpListener, ctx: AppContext, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(ctx))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))
}
