//! Route definitions for buffered annotation upload, flush, and reads.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::annotations;
use crate::state::AppState;

/// ```text
/// POST   /upload_annotations                             upload_annotations
/// POST   /flush_annotations                              flush_annotations
/// GET    /get_annotations/{annotator_id}/{signal_id}     get_annotations
/// GET    /get_compiled/{signal_id}                       get_compiled
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload_annotations", post(annotations::upload_annotations))
        .route("/flush_annotations", post(annotations::flush_annotations))
        .route(
            "/get_annotations/{annotator_id}/{signal_id}",
            get(annotations::get_annotations),
        )
        .route("/get_compiled/{signal_id}", get(annotations::get_compiled))
}
