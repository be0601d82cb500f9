use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether a broker channel is currently open.
    pub queue_connected: bool,
    /// Whether the status store answered a ping.
    pub store_healthy: bool,
}

/// GET /health -- returns service, broker and store health.
///
/// Always 200; a missing dependency shows up as `"degraded"`.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue_connected = state.queue.is_connected().await;
    let store_healthy = state.store.ping().await.is_ok();

    let status = if queue_connected && store_healthy {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        queue_connected,
        store_healthy,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
