//! On-disk layout of the annotation store.
//!
//! ```text
//! {annotation_dir}/{annotator_id}/{signal_id}.parquet   per-annotator table
//! {compiled_dir}/{signal_id}_merged.parquet             compiled table
//! {signal_dir}/{signal_id}.parquet                      raw signal
//! {signal_registry}                                     signal listing (JSON)
//! {annotators_file}                                     allow-list (JSON)
//! ```
//!
//! Identifiers are validated by `siglabel_core::types::validate_id` before
//! they reach this module, so joining them onto a directory cannot escape it.

use std::path::{Path, PathBuf};

use siglabel_core::BufferKey;

/// Extension shared by every table file.
const TABLE_EXT: &str = "parquet";

/// Suffix of compiled (cross-annotator) table names.
const COMPILED_SUFFIX: &str = "_merged";

/// Locations of every file the backend reads or writes.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    pub signal_dir: PathBuf,
    pub annotation_dir: PathBuf,
    pub compiled_dir: PathBuf,
    pub signal_registry: PathBuf,
    pub annotators_file: PathBuf,
}

impl StoreLayout {
    /// Layout rooted at `root`, using the conventional names.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            signal_dir: root.join("signals"),
            annotation_dir: root.join("annotations"),
            compiled_dir: root.join("compiled"),
            signal_registry: root.join("signal_registry.json"),
            annotators_file: root.join("annotators.json"),
        }
    }

    /// Per-annotator table for `key`.
    pub fn annotator_table(&self, key: &BufferKey) -> PathBuf {
        self.annotation_dir
            .join(&key.annotator_id)
            .join(format!("{}.{TABLE_EXT}", key.signal_id))
    }

    /// Compiled table for `signal_id`.
    pub fn compiled_table(&self, signal_id: &str) -> PathBuf {
        self.compiled_dir
            .join(format!("{signal_id}{COMPILED_SUFFIX}.{TABLE_EXT}"))
    }

    /// Raw signal table for `signal_id`.
    pub fn signal_table(&self, signal_id: &str) -> PathBuf {
        self.signal_dir.join(format!("{signal_id}.{TABLE_EXT}"))
    }

    /// Create the three storage directories if they do not exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.signal_dir, &self.annotation_dir, &self.compiled_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_layout() {
        let layout = StoreLayout::under("/data");
        let key = BufferKey::new("alice", "ppg-7").unwrap();

        assert_eq!(
            layout.annotator_table(&key),
            PathBuf::from("/data/annotations/alice/ppg-7.parquet")
        );
        assert_eq!(
            layout.compiled_table("ppg-7"),
            PathBuf::from("/data/compiled/ppg-7_merged.parquet")
        );
        assert_eq!(
            layout.signal_table("ppg-7"),
            PathBuf::from("/data/signals/ppg-7.parquet")
        );
    }

    #[test]
    fn underscores_do_not_collide() {
        let layout = StoreLayout::under("/data");
        let a = BufferKey::new("a_b", "c").unwrap();
        let b = BufferKey::new("a", "b_c").unwrap();
        assert_ne!(layout.annotator_table(&a), layout.annotator_table(&b));
    }
}
