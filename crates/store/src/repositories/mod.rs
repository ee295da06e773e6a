//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&StoreLayout` as the first argument.

pub mod annotation_repo;
pub mod annotator_repo;
pub mod signal_repo;

pub use annotation_repo::{merge_tables, AnnotationRepo, MergeOutcome, MergeSummary};
pub use annotator_repo::AnnotatorRepo;
pub use signal_repo::SignalRepo;
