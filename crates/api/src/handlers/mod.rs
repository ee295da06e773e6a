pub mod annotations;
pub mod annotators;
pub mod signals;

use siglabel_core::error::CoreError;
use siglabel_core::types::validate_id;
use siglabel_store::repositories::AnnotatorRepo;

use crate::error::AppResult;
use crate::state::AppState;

/// Reject annotator ids that are malformed (400) or not on the allow-list (403).
pub async fn ensure_annotator_allowed(state: &AppState, annotator_id: &str) -> AppResult<()> {
    validate_id("annotator_id", annotator_id)?;

    if AnnotatorRepo::is_allowed(&state.layout, annotator_id).await? {
        Ok(())
    } else {
        tracing::warn!(annotator_id, "Rejected unknown annotator");
        Err(CoreError::Forbidden(format!("Invalid annotator ID '{annotator_id}'")).into())
    }
}
