//! Repository for the annotator allow-list.
//!
//! The file is re-read on every call so that edits take effect without a
//! restart. Format: `{"annotators": ["alice", "bob"]}`.

use serde::Deserialize;

use crate::error::StoreError;
use crate::layout::StoreLayout;

#[derive(Debug, Deserialize)]
struct AllowList {
    annotators: Vec<String>,
}

/// Provides lookups against the annotator allow-list.
pub struct AnnotatorRepo;

impl AnnotatorRepo {
    /// List every allowed annotator id.
    ///
    /// A missing allow-list is an error, not an empty list: with no file
    /// nobody would be able to annotate and the cause would be invisible.
    pub async fn list(layout: &StoreLayout) -> Result<Vec<String>, StoreError> {
        let bytes = tokio::fs::read(&layout.annotators_file).await?;
        let allow_list: AllowList = serde_json::from_slice(&bytes)?;
        Ok(allow_list.annotators)
    }

    /// Whether `annotator_id` appears in the allow-list.
    pub async fn is_allowed(layout: &StoreLayout, annotator_id: &str) -> Result<bool, StoreError> {
        Ok(Self::list(layout)
            .await?
            .iter()
            .any(|allowed| allowed == annotator_id))
    }
}
