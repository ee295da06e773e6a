//! Repository for raw signals and the signal registry.

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::layout::StoreLayout;
use crate::table::open_if_exists;

/// Provides read access to signal tables and the registry document.
pub struct SignalRepo;

impl SignalRepo {
    /// Return the registry document, or `{"signals": []}` if there is none.
    pub async fn list(layout: &StoreLayout) -> Result<Value, StoreError> {
        match tokio::fs::read(&layout.signal_registry).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(json!({ "signals": [] })),
            Err(e) => Err(e.into()),
        }
    }

    /// Load every row of the signal table as a JSON object.
    pub async fn load_rows(layout: &StoreLayout, signal_id: &str) -> Result<Vec<Value>, StoreError> {
        let path = layout.signal_table(signal_id);
        let id = signal_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<Value>, StoreError> {
            let file = open_if_exists(&path)?.ok_or(StoreError::NotFound {
                entity: "Signal",
                id,
            })?;

            let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
            let mut writer = arrow::json::ArrayWriter::new(Vec::new());
            for batch in reader {
                writer.write(&batch?)?;
            }
            writer.finish()?;

            let bytes = writer.into_inner();
            if bytes.is_empty() {
                return Ok(Vec::new());
            }
            Ok(serde_json::from_slice(&bytes)?)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
