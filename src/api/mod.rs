//! REST API for fleet and event administration.
//!
//! Routes:
//! - `POST /api/ven`, `POST /api/remove_ven`, `GET /api/list_vens`
//! - `POST /api/event`, `POST /api/cancel_event`, `GET /api/all_events`
//! - `GET /api/ven/{resource}/events`

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::vtn::Vtn;

pub use handlers::error_response;
pub use types::{ErrorResponse, EventRow, VenSummary};

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared VTN instance
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<Vtn>) -> Router {
    Router::new()
        .route("/api/ven", post(handlers::post_ven))
        .route("/api/remove_ven", post(handlers::post_remove_ven))
        .route("/api/list_vens", get(handlers::get_list_vens))
        .route("/api/event", post(handlers::post_event))
        .route("/api/cancel_event", post(handlers::post_cancel_event))
        .route("/api/all_events", get(handlers::get_all_events))
        .route("/api/ven/{resource}/events", get(handlers::get_ven_events))
        .with_state(state)
}

/// Binds to the given address and serves the API until `shutdown` resolves.
///
/// # Arguments
///
/// * `state` - Shared VTN instance
/// * `addr` - Socket address to bind to
/// * `shutdown` - Future that completes when the server should stop
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(
    state: Arc<Vtn>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
