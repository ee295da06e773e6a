use axum::routing::get;
use axum::Router;

use crate::handlers::{annotators, signals};
use crate::state::AppState;

/// ```text
/// GET    /signals                                        list_signals
/// GET    /load_signal/{signal_id}/{annotator_id}         load_signal
/// GET    /validate_annotator/{annotator_id}              validate_annotator
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signals", get(signals::list_signals))
        .route(
            "/load_signal/{signal_id}/{annotator_id}",
            get(signals::load_signal),
        )
        .route(
            "/validate_annotator/{annotator_id}",
            get(annotators::validate_annotator),
        )
}
