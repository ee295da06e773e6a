use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::handlers::ensure_annotator_allowed;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub status: &'static str,
}

/// GET /validate_annotator/{annotator_id}
pub async fn validate_annotator(
    State(state): State<AppState>,
    Path(annotator_id): Path<String>,
) -> AppResult<Json<ValidateResponse>> {
    ensure_annotator_allowed(&state, &annotator_id).await?;
    Ok(Json(ValidateResponse { status: "ok" }))
}
