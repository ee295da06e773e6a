//! In-memory pending-annotation buffer.
//!
//! [`AnnotationBuffer`] maps each [`BufferKey`] to the ordered records that
//! have been accepted but not yet merged into durable storage. It is created
//! empty at process start and is never persisted; whatever is still buffered
//! when the process dies is lost.
//!
//! Every operation takes one mapping-wide lock for the duration of the
//! in-memory mutation only. Callers must never do I/O while a method of this
//! type is running, and no method here awaits or blocks on anything but the
//! lock itself.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::annotation::AnnotationRecord;
use crate::types::BufferKey;

type Entries = HashMap<BufferKey, Vec<AnnotationRecord>>;

/// Process-wide pending state, shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct AnnotationBuffer {
    entries: Mutex<Entries>,
}

impl AnnotationBuffer {
    /// Create a new, empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The mapping is left consistent by every method (each mutation is a
    /// single `HashMap`/`Vec` call), so a poisoned lock is still usable.
    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `records` to the end of `key`'s queue, creating it if absent.
    ///
    /// Returns the queue length after the append.
    pub fn append(&self, key: &BufferKey, records: Vec<AnnotationRecord>) -> usize {
        let mut entries = self.entries();
        let queue = entries.entry(key.clone()).or_default();
        queue.extend(records);
        queue.len()
    }

    /// Capture every non-empty queue and reset it to empty in place.
    ///
    /// Keys stay in the mapping. Records appended after this call returns
    /// belong to the next capture.
    pub fn drain_all(&self) -> HashMap<BufferKey, Vec<AnnotationRecord>> {
        let mut entries = self.entries();
        entries
            .iter_mut()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(key, queue)| (key.clone(), std::mem::take(queue)))
            .collect()
    }

    /// Capture every non-empty queue of `signal_id`, ordered by key, and
    /// reset each to empty in place.
    pub fn drain_signal(&self, signal_id: &str) -> Vec<(BufferKey, Vec<AnnotationRecord>)> {
        let mut drained: Vec<_> = {
            let mut entries = self.entries();
            entries
                .iter_mut()
                .filter(|(key, queue)| key.signal_id == signal_id && !queue.is_empty())
                .map(|(key, queue)| (key.clone(), std::mem::take(queue)))
                .collect()
        };
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
    }

    /// Signals that have at least one non-empty queue.
    pub fn pending_signals(&self) -> BTreeSet<String> {
        self.entries()
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(key, _)| key.signal_id.clone())
            .collect()
    }

    /// Remove `key` entirely and return what it held (empty if absent).
    pub fn drain_one(&self, key: &BufferKey) -> Vec<AnnotationRecord> {
        self.entries().remove(key).unwrap_or_default()
    }

    /// Append `records` and remove `key` in one critical section.
    ///
    /// Equivalent to `append` followed by `drain_one` with no other buffer
    /// operation able to run in between.
    pub fn append_and_drain(
        &self,
        key: &BufferKey,
        records: Vec<AnnotationRecord>,
    ) -> Vec<AnnotationRecord> {
        let mut entries = self.entries();
        let mut queue = entries.remove(key).unwrap_or_default();
        queue.extend(records);
        queue
    }

    /// Put a batch whose merge failed back at the front of `key`'s queue.
    ///
    /// Anything appended since the batch was drained stays behind it, so the
    /// next merge sees the records in their original order.
    pub fn requeue_front(&self, key: &BufferKey, records: Vec<AnnotationRecord>) -> usize {
        if records.is_empty() {
            return self.pending_len(key);
        }
        let mut entries = self.entries();
        let queue = entries.entry(key.clone()).or_default();
        queue.splice(0..0, records);
        queue.len()
    }

    /// Number of records currently pending for `key`.
    pub fn pending_len(&self, key: &BufferKey) -> usize {
        self.entries().get(key).map_or(0, Vec::len)
    }

    /// Number of records pending across all keys.
    pub fn pending_total(&self) -> usize {
        self.entries().values().map(Vec::len).sum()
    }

    /// Whether no record is pending for any key.
    pub fn is_empty(&self) -> bool {
        self.entries().values().all(Vec::is_empty)
    }
}
