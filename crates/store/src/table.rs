//! Parquet encoding of annotation tables and crash-safe table replacement.
//!
//! A table is rewritten in full on every merge: the new contents are
//! serialized in memory, written to a temporary file in the destination
//! directory, synced, and renamed over the old file. Readers therefore see
//! either the previous table or the new one, never a partial file.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use siglabel_core::annotation::dedupe_last_wins;
use siglabel_core::AnnotationRecord;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

pub const COL_SEGMENT_INDEX: &str = "segment_index";
pub const COL_START: &str = "start";
pub const COL_END: &str = "end";
pub const COL_LABEL: &str = "snorkel_label";
pub const COL_CONFIDENCE: &str = "snorkel_confidence";
pub const COL_ANNOTATOR: &str = "annotator_id";

/// Arrow schema shared by per-annotator and compiled tables.
pub fn annotation_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(COL_SEGMENT_INDEX, DataType::Int64, false),
        Field::new(COL_START, DataType::Int64, false),
        Field::new(COL_END, DataType::Int64, false),
        Field::new(COL_LABEL, DataType::Float64, false),
        Field::new(COL_CONFIDENCE, DataType::Float64, false),
        Field::new(COL_ANNOTATOR, DataType::Utf8, false),
    ]))
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Open `path` for reading, mapping a missing file to `None`.
pub(crate) fn open_if_exists(path: &Path) -> Result<Option<File>, StoreError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read every record of the table at `path`, or `None` if it does not exist.
pub fn read_records(path: &Path) -> Result<Option<Vec<AnnotationRecord>>, StoreError> {
    let Some(file) = open_if_exists(path)? else {
        return Ok(None);
    };

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut records = Vec::new();
    for batch in reader {
        records.extend(decode_batch(path, &batch?)?);
    }
    Ok(Some(records))
}

/// Fetch `name` from `batch`, coerced to `data_type`.
///
/// Tables written by other tools may use narrower integer or large-string
/// columns; those are cast. Missing columns and nulls mark the table corrupt.
fn typed_column<T: Array + Clone + 'static>(
    path: &Path,
    batch: &RecordBatch,
    name: &str,
    data_type: &DataType,
) -> Result<T, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let column = batch
        .column_by_name(name)
        .ok_or_else(|| corrupt(format!("missing column '{name}'")))?;
    let column: ArrayRef = if column.data_type() == data_type {
        Arc::clone(column)
    } else {
        cast(column.as_ref(), data_type)?
    };
    if column.null_count() > 0 {
        return Err(corrupt(format!("column '{name}' contains nulls")));
    }

    column
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| corrupt(format!("column '{name}' is not {data_type}")))
}

fn non_negative(path: &Path, name: &str, value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: format!("negative value {value} in column '{name}'"),
    })
}

fn decode_batch(path: &Path, batch: &RecordBatch) -> Result<Vec<AnnotationRecord>, StoreError> {
    let segment: Int64Array = typed_column(path, batch, COL_SEGMENT_INDEX, &DataType::Int64)?;
    let start: Int64Array = typed_column(path, batch, COL_START, &DataType::Int64)?;
    let end: Int64Array = typed_column(path, batch, COL_END, &DataType::Int64)?;
    let label: Float64Array = typed_column(path, batch, COL_LABEL, &DataType::Float64)?;
    let confidence: Float64Array =
        typed_column(path, batch, COL_CONFIDENCE, &DataType::Float64)?;
    let annotator: StringArray = typed_column(path, batch, COL_ANNOTATOR, &DataType::Utf8)?;

    (0..batch.num_rows())
        .map(|i| {
            Ok(AnnotationRecord {
                segment_index: non_negative(path, COL_SEGMENT_INDEX, segment.value(i))?,
                start: non_negative(path, COL_START, start.value(i))?,
                end: non_negative(path, COL_END, end.value(i))?,
                snorkel_label: label.value(i),
                snorkel_confidence: confidence.value(i),
                annotator_id: annotator.value(i).to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn offsets(
    records: &[AnnotationRecord],
    name: &str,
    field: impl Fn(&AnnotationRecord) -> u64,
) -> Result<Int64Array, StoreError> {
    records
        .iter()
        .map(|r| {
            let value = field(r);
            i64::try_from(value).map_err(|_| {
                StoreError::OutOfRange(format!("value {value} in column '{name}' exceeds i64"))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Int64Array::from)
}

/// Serialize `records` into an in-memory Parquet file.
pub fn encode_records(records: &[AnnotationRecord]) -> Result<Vec<u8>, StoreError> {
    let schema = annotation_schema();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(offsets(records, COL_SEGMENT_INDEX, |r| r.segment_index)?),
        Arc::new(offsets(records, COL_START, |r| r.start)?),
        Arc::new(offsets(records, COL_END, |r| r.end)?),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.snorkel_label),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.snorkel_confidence),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.annotator_id.as_str()),
        )),
    ];
    let batch = RecordBatch::try_new(Arc::clone(&schema), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

/// Replace the file at `path` with `bytes` via temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".pending-")
        .suffix(".parquet")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge `new_records` into the table at `path`.
///
/// Loads the existing table (empty if absent), appends `new_records`, keeps
/// the last occurrence of each `(segment_index, annotator_id)`, and replaces
/// the table. Returns the number of rows written; an empty batch writes
/// nothing and returns 0.
pub fn merge_into(path: &Path, new_records: &[AnnotationRecord]) -> Result<usize, StoreError> {
    if new_records.is_empty() {
        return Ok(0);
    }

    let mut rows = read_records(path)?.unwrap_or_default();
    rows.extend_from_slice(new_records);
    let rows = dedupe_last_wins(rows);

    write_atomic(path, &encode_records(&rows)?)?;
    Ok(rows.len())
}
