use std::path::PathBuf;

/// Errors raised while reading or writing durable tables and registry files.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt table {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
