//! Drain-and-merge orchestration for buffered annotations.
//!
//! Ingress only ever touches the [`AnnotationBuffer`]. The two drain paths,
//! the periodic [`MergePipeline::flush_all`] and the on-demand
//! [`MergePipeline::flush_key`], each run "drain, then merge" while holding
//! the merge gate of the signal involved. The gate keeps batches drained for
//! the same key merging in drain order, and keeps two annotators of one
//! signal from rewriting the shared compiled table at the same time. Signals
//! have separate gates, so merges for different signals run in parallel. The
//! buffer lock is never held across the merge.
//!
//! Every drain-merge unit runs in its own spawned task that owns its gate
//! guard. Dropping the caller (a client disconnect, a request timeout) does
//! not stop the unit: the merge finishes, a failed batch is re-queued, and
//! only then is the gate released.
//!
//! A batch whose merge fails is put back at the front of its key's queue and
//! retried by the next drain. Re-merging is safe even when one of the two
//! tables was already written: last-write-wins makes the merge idempotent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use siglabel_core::{AnnotationBuffer, AnnotationRecord, BufferKey};
use siglabel_store::repositories::AnnotationRepo;
use siglabel_store::{StoreError, StoreLayout};

use crate::error::{AppError, AppResult};

/// Consecutive failed merges after which a key is reported as stuck.
pub const STUCK_AFTER_FAILURES: u32 = 3;

/// Result of an on-demand flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushResult {
    /// This many records were merged into durable storage.
    Flushed(usize),
    /// The key had no pending records; no I/O was performed.
    NothingToFlush,
}

/// Summary of one periodic flush cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Keys whose batches merged successfully.
    pub keys: usize,
    /// Records merged successfully.
    pub records: usize,
    /// Keys whose merge failed and whose batches were re-queued.
    pub failed_keys: Vec<BufferKey>,
}

impl FlushReport {
    fn absorb(&mut self, other: FlushReport) {
        self.keys += other.keys;
        self.records += other.records;
        self.failed_keys.extend(other.failed_keys);
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Owns the annotation buffer and every path that moves records out of it.
pub struct MergePipeline {
    inner: Arc<Inner>,
}

struct Inner {
    buffer: Arc<AnnotationBuffer>,
    layout: Arc<StoreLayout>,
    gates: Mutex<HashMap<String, Gate>>,
    failures: Mutex<HashMap<BufferKey, u32>>,
    merged_records: AtomicUsize,
}

impl MergePipeline {
    pub fn new(buffer: Arc<AnnotationBuffer>, layout: Arc<StoreLayout>) -> Self {
        Self {
            inner: Arc::new(Inner {
                buffer,
                layout,
                gates: Mutex::new(HashMap::new()),
                failures: Mutex::new(HashMap::new()),
                merged_records: AtomicUsize::new(0),
            }),
        }
    }

    pub fn buffer(&self) -> &AnnotationBuffer {
        &self.inner.buffer
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.inner.layout
    }

    /// Total records successfully merged since startup.
    pub fn merged_records(&self) -> usize {
        self.inner.merged_records.load(Ordering::Relaxed)
    }

    /// Failed merges for `key` since its last successful one.
    pub fn consecutive_failures(&self, key: &BufferKey) -> u32 {
        self.inner.failures().get(key).copied().unwrap_or(0)
    }

    /// Keys that have failed at least [`STUCK_AFTER_FAILURES`] merges in a row.
    pub fn stuck_keys(&self) -> Vec<BufferKey> {
        let mut keys: Vec<_> = self
            .inner
            .failures()
            .iter()
            .filter(|(_, failures)| **failures >= STUCK_AFTER_FAILURES)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Buffer `records` for `key` without touching durable storage.
    ///
    /// Returns the key's pending count after the append.
    pub fn ingest(&self, key: &BufferKey, records: Vec<AnnotationRecord>) -> usize {
        self.inner.buffer.append(key, records)
    }

    /// Append `records` (possibly none) to `key` and merge everything the key
    /// has pending.
    ///
    /// On merge failure the batch is re-queued and the error returned. The
    /// work completes even if the returned future is dropped.
    pub async fn flush_key(
        &self,
        key: &BufferKey,
        records: Vec<AnnotationRecord>,
    ) -> AppResult<FlushResult> {
        let inner = Arc::clone(&self.inner);
        let key = key.clone();

        let unit = tokio::spawn(async move {
            let _gate = inner.gate(&key.signal_id).lock_owned().await;

            let batch = if records.is_empty() {
                inner.buffer.drain_one(&key)
            } else {
                inner.buffer.append_and_drain(&key, records)
            };
            if batch.is_empty() {
                return Ok(FlushResult::NothingToFlush);
            }

            let count = batch.len();
            let merged = inner.merge_batch(&key, batch).await;
            match merged {
                Ok(()) => Ok(FlushResult::Flushed(count)),
                Err(source) => Err(AppError::MergeFailure { key, source }),
            }
        });

        unit.await
            .map_err(|e| AppError::Store(StoreError::Task(e.to_string())))?
    }

    /// Drain every signal with pending records and merge its batches.
    ///
    /// Batches of one signal merge sequentially since they share the
    /// compiled table; different signals merge concurrently. A failing key
    /// is logged and re-queued without affecting the others.
    pub async fn flush_all(&self) -> FlushReport {
        let signals = self.inner.buffer.pending_signals();
        if signals.is_empty() {
            return FlushReport::default();
        }

        let units = signals.into_iter().map(|signal_id| {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.flush_signal(&signal_id).await })
        });

        let mut report = FlushReport::default();
        for result in join_all(units).await {
            match result {
                Ok(r) => report.absorb(r),
                Err(e) => tracing::error!(error = %e, "Signal flush task failed"),
            }
        }
        report
    }
}

impl Inner {
    fn gate(&self, signal_id: &str) -> Gate {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(signal_id.to_string()).or_default())
    }

    fn failures(&self) -> MutexGuard<'_, HashMap<BufferKey, u32>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn flush_signal(&self, signal_id: &str) -> FlushReport {
        let _gate = self.gate(signal_id).lock_owned().await;

        let mut report = FlushReport::default();
        for (key, batch) in self.buffer.drain_signal(signal_id) {
            let count = batch.len();
            let merged = self.merge_batch(&key, batch).await;
            match merged {
                Ok(()) => {
                    report.keys += 1;
                    report.records += count;
                }
                Err(e) => {
                    tracing::error!(
                        key = %key,
                        records = count,
                        error = %e,
                        "Background merge failed, batch re-queued"
                    );
                    report.failed_keys.push(key);
                }
            }
        }
        report
    }

    /// Merge one drained batch, re-queueing it if either table write fails.
    async fn merge_batch(
        &self,
        key: &BufferKey,
        batch: Vec<AnnotationRecord>,
    ) -> Result<(), StoreError> {
        let count = batch.len();
        let outcome = AnnotationRepo::merge(&self.layout, key, batch.clone()).await;

        match outcome.into_result() {
            Ok(summary) => {
                self.merged_records.fetch_add(count, Ordering::Relaxed);
                if let Some(failures) = self.failures().remove(key) {
                    tracing::info!(key = %key, failures, "Merge recovered after failures");
                }
                tracing::debug!(
                    key = %key,
                    records = count,
                    annotator_rows = summary.annotator_rows,
                    compiled_rows = summary.compiled_rows,
                    "Batch merged"
                );
                Ok(())
            }
            Err(e) => {
                let pending = self.buffer.requeue_front(key, batch);
                let failures = {
                    let mut all = self.failures();
                    let failures = all.entry(key.clone()).or_insert(0);
                    *failures += 1;
                    *failures
                };
                if failures >= STUCK_AFTER_FAILURES {
                    tracing::error!(
                        key = %key,
                        failures,
                        pending,
                        "Key is stuck: every merge attempt fails, records stay buffered"
                    );
                } else {
                    tracing::warn!(
                        key = %key,
                        failures,
                        pending,
                        "Re-queued batch after failed merge"
                    );
                }
                Err(e)
            }
        }
    }
}
