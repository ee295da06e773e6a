use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use siglabel_core::error::CoreError;
use siglabel_core::BufferKey;
use siglabel_store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for storage
/// errors, and adds HTTP-specific variants. Implements [`IntoResponse`] to
/// produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `siglabel_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage error from `siglabel_store`.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Merging a drained batch failed. The batch has been re-queued.
    #[error("Merge failed for {key}: {source}")]
    MergeFailure {
        key: BufferKey,
        #[source]
        source: StoreError,
    },

    /// The request body could not be read as the expected JSON document.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            },

            // --- Storage errors ---
            AppError::Store(err) => classify_store_error(err),

            AppError::MergeFailure { key, source } => {
                tracing::error!(key = %key, error = %source, "Annotation merge failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MERGE_FAILURE",
                    format!("Failed to persist annotations for {key}; they remain buffered"),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a storage error into an HTTP status, error code, and message.
///
/// - `NotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} not found: {id}"),
        ),
        other => {
            tracing::error!(error = %other, "Storage error");
            internal()
        }
    }
}
