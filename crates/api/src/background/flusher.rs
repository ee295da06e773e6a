//! Periodic flush of the annotation buffer to durable storage.
//!
//! Wakes every `interval`, drains every non-empty buffer entry, and merges
//! each batch via [`MergePipeline::flush_all`]. On cancellation it runs one
//! last cycle so that records buffered before a graceful shutdown are not
//! lost. Records still buffered when the process is killed are lost.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::engine::{FlushReport, MergePipeline};

/// Background buffer flusher.
///
/// A single long-lived Tokio task, started once at process startup.
pub struct BackgroundFlusher {
    pipeline: Arc<MergePipeline>,
    interval: Duration,
}

impl BackgroundFlusher {
    pub fn new(pipeline: Arc<MergePipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// Run the flush loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Annotation flusher started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Annotation flusher stopping, running final flush");
                    self.run_cycle().await;
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        let pending = self.pipeline.buffer().pending_total();
        if pending > 0 {
            tracing::warn!(pending, "Annotation flusher stopped with records still buffered");
        } else {
            tracing::info!("Annotation flusher stopped");
        }
    }

    /// One flush cycle: drain all keys and merge them.
    pub async fn run_cycle(&self) -> FlushReport {
        let report = self.pipeline.flush_all().await;

        if !report.failed_keys.is_empty() {
            tracing::error!(
                keys = report.keys,
                records = report.records,
                failed = report.failed_keys.len(),
                "Flush cycle finished with failures",
            );
        } else if report.records > 0 {
            tracing::info!(
                keys = report.keys,
                records = report.records,
                "Flush cycle merged buffered annotations",
            );
        } else {
            tracing::trace!("Flush cycle: nothing buffered");
        }

        report
    }
}
