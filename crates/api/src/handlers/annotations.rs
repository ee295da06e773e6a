//! Handlers for buffering, flushing, and reading segment annotations.
//!
//! Uploads only append to the in-memory buffer; durable writes happen in the
//! background flusher or on an explicit flush request.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use siglabel_core::annotation::parse_records;
use siglabel_core::types::validate_id;
use siglabel_core::BufferKey;
use siglabel_store::repositories::AnnotationRepo;

use crate::engine::FlushResult;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::handlers::ensure_annotator_allowed;
use crate::state::AppState;

/* --------------------------------------------------------------------------
   Request / response bodies
   -------------------------------------------------------------------------- */

/// Body of `POST /upload_annotations` and `POST /flush_annotations`.
///
/// `annotations` stays untyped here so that each record can be parsed
/// individually and reported by index.
#[derive(Debug, Deserialize)]
pub struct AnnotationUpload {
    pub annotator_id: String,
    pub signal_id: String,
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub buffer_length: usize,
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl From<FlushResult> for FlushResponse {
    fn from(result: FlushResult) -> Self {
        match result {
            FlushResult::Flushed(count) => Self {
                status: "flushed",
                count: Some(count),
            },
            FlushResult::NothingToFlush => Self {
                status: "nothing to flush",
                count: None,
            },
        }
    }
}

/* --------------------------------------------------------------------------
   Handlers
   -------------------------------------------------------------------------- */

/// POST /upload_annotations
///
/// Validate the records and append them to the key's buffer.
pub async fn upload_annotations(
    State(state): State<AppState>,
    AppJson(input): AppJson<AnnotationUpload>,
) -> AppResult<impl IntoResponse> {
    let key = BufferKey::new(input.annotator_id, input.signal_id)?;
    ensure_annotator_allowed(&state, &key.annotator_id).await?;

    let records = parse_records(&key.annotator_id, input.annotations)?;
    let received = records.len();
    let buffer_length = state.pipeline.ingest(&key, records);

    tracing::info!(key = %key, received, buffer_length, "Annotations buffered");

    Ok(Json(UploadResponse {
        status: "buffered",
        buffer_length,
    }))
}

/// POST /flush_annotations
///
/// Append any records in the body, then merge everything pending for the
/// key. Reports `"nothing to flush"` when the key has no pending records.
pub async fn flush_annotations(
    State(state): State<AppState>,
    AppJson(input): AppJson<AnnotationUpload>,
) -> AppResult<impl IntoResponse> {
    let key = BufferKey::new(input.annotator_id, input.signal_id)?;
    ensure_annotator_allowed(&state, &key.annotator_id).await?;

    let records = parse_records(&key.annotator_id, input.annotations)?;
    let result = state.pipeline.flush_key(&key, records).await?;

    match result {
        FlushResult::Flushed(count) => tracing::info!(key = %key, count, "Annotations flushed"),
        FlushResult::NothingToFlush => tracing::debug!(key = %key, "Nothing to flush"),
    }

    Ok(Json(FlushResponse::from(result)))
}

/// GET /get_annotations/{annotator_id}/{signal_id}
///
/// Read the annotator's durable table for the signal. Buffered records that
/// have not been flushed yet are not included.
pub async fn get_annotations(
    State(state): State<AppState>,
    Path((annotator_id, signal_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    ensure_annotator_allowed(&state, &annotator_id).await?;
    let key = BufferKey::new(annotator_id, signal_id)?;

    let records = AnnotationRepo::find_by_key(&state.layout, &key).await?;
    Ok(Json(records))
}

/// GET /get_compiled/{signal_id}
///
/// Read the cross-annotator compiled table for a signal.
pub async fn get_compiled(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    validate_id("signal_id", &signal_id)?;

    let records = AnnotationRepo::find_compiled(&state.layout, &signal_id).await?;
    Ok(Json(records))
}
