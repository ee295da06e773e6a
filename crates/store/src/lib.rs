//! Durable storage for the segment annotation backend.
//!
//! Annotation tables are Parquet files laid out by [`StoreLayout`]; the
//! [`repositories`] module provides the operations the API layer uses.

pub mod error;
pub mod layout;
pub mod repositories;
pub mod table;

pub use error::StoreError;
pub use layout::StoreLayout;

/// Prepare a layout for use, creating its storage directories.
pub fn open(layout: StoreLayout) -> Result<StoreLayout, StoreError> {
    layout.ensure_dirs()?;
    Ok(layout)
}

/// Verify the storage directories exist and are directories.
pub async fn health_check(layout: &StoreLayout) -> Result<(), StoreError> {
    for dir in [&layout.signal_dir, &layout.annotation_dir, &layout.compiled_dir] {
        let meta = tokio::fs::metadata(dir).await?;
        if !meta.is_dir() {
            return Err(StoreError::Io(std::io::Error::other(format!(
                "{} is not a directory",
                dir.display()
            ))));
        }
    }
    Ok(())
}
