//! Domain types and in-memory state for the segment annotation backend.
//!
//! - [`annotation`] — the [`AnnotationRecord`] row, ingress parsing, and
//!   last-write-wins deduplication.
//! - [`buffer`] — the process-wide [`AnnotationBuffer`] of pending records.
//! - [`types`] — [`BufferKey`] and identifier validation.

pub mod annotation;
pub mod buffer;
pub mod error;
pub mod types;

pub use annotation::AnnotationRecord;
pub use buffer::AnnotationBuffer;
pub use types::BufferKey;
