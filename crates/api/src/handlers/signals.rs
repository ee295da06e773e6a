//! Handlers for the signal registry and raw signal loading.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use siglabel_core::types::validate_id;
use siglabel_store::repositories::SignalRepo;

use crate::error::AppResult;
use crate::handlers::ensure_annotator_allowed;
use crate::state::AppState;

/// GET /signals
pub async fn list_signals(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(SignalRepo::list(&state.layout).await?))
}

/// GET /load_signal/{signal_id}/{annotator_id}
///
/// Return the signal's rows for an allowed annotator.
pub async fn load_signal(
    State(state): State<AppState>,
    Path((signal_id, annotator_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    ensure_annotator_allowed(&state, &annotator_id).await?;
    validate_id("signal_id", &signal_id)?;

    let rows = SignalRepo::load_rows(&state.layout, &signal_id).await?;
    tracing::debug!(
        signal_id = %signal_id,
        annotator_id = %annotator_id,
        rows = rows.len(),
        "Signal loaded"
    );
    Ok(Json(rows))
}
