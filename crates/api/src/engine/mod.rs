//! Annotation merge engine.

pub mod pipeline;

pub use pipeline::{FlushReport, FlushResult, MergePipeline, STUCK_AFTER_FAILURES};
