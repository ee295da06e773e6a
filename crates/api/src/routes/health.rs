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
    /// Whether the storage directories are usable.
    pub storage_healthy: bool,
    /// Records buffered but not yet merged.
    pub pending_records: usize,
    /// Records merged since startup.
    pub merged_records: usize,
    /// Keys whose merges keep failing.
    pub stuck_keys: usize,
}

/// GET /health -- returns service and storage health.
///
/// Degraded when storage is unusable or some key's merges keep failing.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage_healthy = siglabel_store::health_check(&state.layout).await.is_ok();

    let stuck_keys = state.pipeline.stuck_keys().len();

    let status = if storage_healthy && stuck_keys == 0 {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        storage_healthy,
        pending_records: state.pipeline.buffer().pending_total(),
        merged_records: state.pipeline.merged_records(),
        stuck_keys,
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
