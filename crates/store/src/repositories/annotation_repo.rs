//! Repository for per-annotator and compiled annotation tables.

use std::path::Path;

use siglabel_core::{AnnotationRecord, BufferKey};

use crate::error::StoreError;
use crate::layout::StoreLayout;
use crate::table;

/// Result of merging one batch into both tables of a key.
///
/// The two writes are independent: each field carries its own outcome, and
/// a failure in one never prevents the other from being attempted.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Rows written to the per-annotator table (0 when nothing was written).
    pub per_annotator: Result<usize, StoreError>,
    /// Rows written to the compiled table (0 when nothing was written).
    pub compiled: Result<usize, StoreError>,
}

/// Row counts of a fully successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub annotator_rows: usize,
    pub compiled_rows: usize,
}

impl MergeOutcome {
    fn task_failed(reason: String) -> Self {
        Self {
            per_annotator: Err(StoreError::Task(reason.clone())),
            compiled: Err(StoreError::Task(reason)),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.per_annotator.is_ok() && self.compiled.is_ok()
    }

    /// Collapse into a single result, reporting the per-annotator failure
    /// first when both writes failed.
    pub fn into_result(self) -> Result<MergeSummary, StoreError> {
        Ok(MergeSummary {
            annotator_rows: self.per_annotator?,
            compiled_rows: self.compiled?,
        })
    }
}

/// Merge `new_records` into the per-annotator table and then, independently,
/// into the compiled table.
///
/// Not safe to run concurrently with another merge touching the same
/// signal; callers serialize merges.
pub fn merge_tables(
    new_records: &[AnnotationRecord],
    per_annotator_path: &Path,
    compiled_path: &Path,
) -> MergeOutcome {
    let per_annotator = table::merge_into(per_annotator_path, new_records);
    if let Err(e) = &per_annotator {
        tracing::error!(
            path = %per_annotator_path.display(),
            error = %e,
            "Per-annotator table merge failed"
        );
    }

    let compiled = table::merge_into(compiled_path, new_records);
    if let Err(e) = &compiled {
        tracing::error!(
            path = %compiled_path.display(),
            error = %e,
            "Compiled table merge failed"
        );
    }

    MergeOutcome {
        per_annotator,
        compiled,
    }
}

/// Provides merge and read operations over annotation tables.
pub struct AnnotationRepo;

impl AnnotationRepo {
    /// Merge a drained batch for `key` into its two tables.
    ///
    /// Parquet I/O is synchronous, so the merge runs on the blocking pool.
    pub async fn merge(
        layout: &StoreLayout,
        key: &BufferKey,
        records: Vec<AnnotationRecord>,
    ) -> MergeOutcome {
        let per_annotator_path = layout.annotator_table(key);
        let compiled_path = layout.compiled_table(&key.signal_id);
        let count = records.len();

        let outcome = tokio::task::spawn_blocking(move || {
            merge_tables(&records, &per_annotator_path, &compiled_path)
        })
        .await
        .unwrap_or_else(|e| MergeOutcome::task_failed(e.to_string()));

        if outcome.is_ok() {
            tracing::debug!(key = %key, records = count, "Merged annotation batch");
        }
        outcome
    }

    /// Read the per-annotator table for `key`.
    pub async fn find_by_key(
        layout: &StoreLayout,
        key: &BufferKey,
    ) -> Result<Vec<AnnotationRecord>, StoreError> {
        let path = layout.annotator_table(key);
        let id = key.to_string();
        Self::read(path, "Annotation table", id).await
    }

    /// Read the compiled table for `signal_id`.
    pub async fn find_compiled(
        layout: &StoreLayout,
        signal_id: &str,
    ) -> Result<Vec<AnnotationRecord>, StoreError> {
        let path = layout.compiled_table(signal_id);
        Self::read(path, "Compiled table", signal_id.to_string()).await
    }

    async fn read(
        path: std::path::PathBuf,
        entity: &'static str,
        id: String,
    ) -> Result<Vec<AnnotationRecord>, StoreError> {
        tokio::task::spawn_blocking(move || table::read_records(&path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??
            .ok_or(StoreError::NotFound { entity, id })
    }
}
