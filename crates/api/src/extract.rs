//! Request extractors whose rejections use the JSON error body.

use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` with its rejection mapped into [`AppError::BadRequest`], so a
/// malformed or mistyped body gets `{"error", "code"}` like every other
/// failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
