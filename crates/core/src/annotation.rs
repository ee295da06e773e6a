//! Segment annotation records: parsing, validation, and last-write-wins
//! deduplication.
//!
//! Records reach the backend as loosely-typed JSON objects. They are parsed
//! into [`AnnotationRecord`] at the ingress boundary so nothing opaque ever
//! reaches the buffer or the durable tables.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One labeled segment of a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_offsets"))]
pub struct AnnotationRecord {
    /// Zero-based index of the fixed-stride window within the signal.
    pub segment_index: u64,
    /// First sample offset of the segment.
    pub start: u64,
    /// Sample offset one past the end of the segment.
    pub end: u64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub snorkel_label: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub snorkel_confidence: f64,
    #[validate(length(min = 1))]
    pub annotator_id: String,
}

impl AnnotationRecord {
    /// The uniqueness key used by every durable table.
    pub fn dedup_key(&self) -> (u64, &str) {
        (self.segment_index, self.annotator_id.as_str())
    }
}

/// Offsets are stored as signed 64-bit columns and must describe a
/// non-inverted span.
fn validate_offsets(record: &AnnotationRecord) -> Result<(), ValidationError> {
    let max = i64::MAX as u64;
    if record.segment_index > max || record.start > max || record.end > max {
        return Err(ValidationError::new("offset_out_of_range"));
    }
    if record.end < record.start {
        return Err(ValidationError::new("end_before_start"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse and validate a batch of raw JSON records for `annotator_id`.
///
/// Fails on the first malformed record; the error names its array index.
/// Every record must carry the same `annotator_id` as the request key.
pub fn parse_records(
    annotator_id: &str,
    raw: Vec<serde_json::Value>,
) -> Result<Vec<AnnotationRecord>, CoreError> {
    raw.into_iter()
        .enumerate()
        .map(|(i, value)| {
            let record: AnnotationRecord = serde_json::from_value(value).map_err(|e| {
                CoreError::Validation(format!("annotations[{i}] is malformed: {e}"))
            })?;

            record.validate().map_err(|e| {
                CoreError::Validation(format!("annotations[{i}] is invalid: {e}"))
            })?;

            if record.annotator_id != annotator_id {
                return Err(CoreError::Validation(format!(
                    "annotations[{i}] belongs to annotator '{}', expected '{annotator_id}'",
                    record.annotator_id
                )));
            }

            Ok(record)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

/// Drop every record whose `(segment_index, annotator_id)` appears again
/// later in the sequence.
///
/// Survivors keep the position of their last occurrence, so a relabelled
/// segment moves to the end.
pub fn dedupe_last_wins(records: Vec<AnnotationRecord>) -> Vec<AnnotationRecord> {
    let keep = {
        let mut last: HashMap<(u64, &str), usize> = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            last.insert(record.dedup_key(), i);
        }
        let mut keep = vec![false; records.len()];
        for i in last.into_values() {
            keep[i] = true;
        }
        keep
    };

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}
