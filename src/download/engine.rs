//! Worker pool that drains the work queue.
//!
//! The engine spawns a fixed number of tokio tasks. Each one repeatedly
//! claims an item from the shared [`WorkQueue`], streams it to a `.part`
//! file, verifies and renames it into place, and only then records the URL
//! in the [`StateLedger`]. A failed item is reported and skipped; it never
//! stops the other workers.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeSet;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//! use specfetch_core::download::{DownloadEngine, HttpClient};
//! use specfetch_core::ledger::StateLedger;
//! use specfetch_core::progress::NoProgress;
//! use specfetch_core::queue::WorkQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Arc::new(StateLedger::load("state.json", "18").await);
//! let queue = Arc::new(WorkQueue::from_candidates(Vec::new(), &BTreeSet::new()));
//! let engine = DownloadEngine::new(7)?;
//! let summary = engine
//!     .run(
//!         queue,
//!         Arc::new(HttpClient::new()?),
//!         ledger,
//!         Arc::new(NoProgress),
//!         Arc::new(AtomicBool::new(false)),
//!     )
//!     .await;
//! println!("Succeeded: {}, Failed: {}", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{FutureExt, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, instrument, warn};

use super::client::{Fetcher, ResourceStream};
use super::constants::{
    CANCEL_POLL_INTERVAL_MS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY,
};
use super::error::{DownloadError, FailureKind};
use super::filename::partial_path;
use crate::ledger::StateLedger;
use crate::progress::{ProgressSink, notify};
use crate::queue::{WorkItem, WorkQueue};

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Result of one worker executing one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Archive written, renamed into place, and recorded in the ledger.
    Success {
        /// Size of the finished file.
        bytes_written: u64,
    },
    /// The item failed; it stays out of the ledger and is retried next run.
    Failure {
        /// Failure category.
        kind: FailureKind,
        /// Human-readable cause.
        message: String,
    },
}

impl DownloadOutcome {
    /// Returns true for [`DownloadOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One item that did not complete this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    /// The item that failed.
    pub item: WorkItem,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable cause.
    pub message: String,
}

/// Totals from one pool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items completed and recorded.
    pub succeeded: usize,
    /// Items that failed.
    pub failed: usize,
    /// Failed items, sorted by source URL.
    pub failed_items: Vec<FailedItem>,
    /// True when cancellation was observed before the queue drained.
    pub interrupted: bool,
    /// Items left unclaimed or cut off mid-transfer by cancellation.
    pub abandoned: usize,
    /// Bytes in files completed this run.
    pub bytes_written: u64,
    /// Workers that died outside per-item handling; what they held is unaccounted.
    pub lost_workers: usize,
}

impl RunSummary {
    /// Returns true when every queued item completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && !self.interrupted && self.lost_workers == 0
    }

    fn merge(&mut self, other: Self) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.failed_items.extend(other.failed_items);
        self.interrupted |= other.interrupted;
        self.abandoned += other.abandoned;
        self.bytes_written += other.bytes_written;
        self.lost_workers += other.lost_workers;
    }
}

/// Fixed-size download worker pool.
///
/// # Concurrency Model
///
/// - Exactly `concurrency` tokio tasks per run, joined before `run` returns
/// - Items are handed out by [`WorkQueue::claim`]; workers share nothing else
///   except the ledger (single writer) and the progress sink (lock-free)
/// - Each worker owns its connection and file handle for one item at a time
/// - No retries within a run; failures are left for the next run
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    concurrency: usize,
}

impl Default for DownloadEngine {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl DownloadEngine {
    /// Creates an engine with the given worker count.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use specfetch_core::download::DownloadEngine;
    ///
    /// let engine = DownloadEngine::new(7).unwrap();
    /// assert_eq!(engine.concurrency(), 7);
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        Ok(Self { concurrency })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Drains `queue` with the worker pool and returns the run totals.
    ///
    /// When `interrupted` becomes `true`, workers stop claiming new items
    /// and abandon in-flight transfers within [`CANCEL_POLL_INTERVAL_MS`],
    /// even while waiting on the network, leaving their `.part` files behind
    /// and the ledger untouched.
    ///
    /// Individual download failures never make this method fail. A panic
    /// while handling an item becomes a [`FailureKind::Internal`] failure
    /// for that item, and a panicking progress sink only loses its event.
    #[instrument(skip_all, fields(concurrency = self.concurrency, queued = queue.len()))]
    pub async fn run(
        &self,
        queue: Arc<WorkQueue>,
        fetcher: Arc<dyn Fetcher>,
        ledger: Arc<StateLedger>,
        progress: Arc<dyn ProgressSink>,
        interrupted: Arc<AtomicBool>,
    ) -> RunSummary {
        info!("starting download workers");

        let handles: Vec<_> = (0..self.concurrency)
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    queue: Arc::clone(&queue),
                    fetcher: Arc::clone(&fetcher),
                    ledger: Arc::clone(&ledger),
                    progress: Arc::clone(&progress),
                    interrupted: Arc::clone(&interrupted),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let mut summary = RunSummary::default();
        for handle in handles {
            match handle.await {
                Ok(partial) => summary.merge(partial),
                Err(e) => {
                    error!(error = %e, "download worker died");
                    summary.lost_workers += 1;
                }
            }
        }

        if interrupted.load(Ordering::SeqCst) {
            summary.interrupted = true;
        }
        let unclaimed = queue.len();
        if unclaimed > 0 {
            summary.abandoned += unclaimed;
        }
        summary
            .failed_items
            .sort_by(|a, b| a.item.key().cmp(b.item.key()));

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            abandoned = summary.abandoned,
            interrupted = summary.interrupted,
            lost_workers = summary.lost_workers,
            "download workers finished"
        );
        notify("on_run_complete", || progress.on_run_complete(&summary));
        summary
    }
}

struct Worker {
    id: usize,
    queue: Arc<WorkQueue>,
    fetcher: Arc<dyn Fetcher>,
    ledger: Arc<StateLedger>,
    progress: Arc<dyn ProgressSink>,
    interrupted: Arc<AtomicBool>,
}

impl Worker {
    async fn run(self) -> RunSummary {
        let mut summary = RunSummary::default();

        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                summary.interrupted = true;
                break;
            }
            let Some(item) = self.queue.claim() else {
                break;
            };
            debug!(worker = self.id, url = %item.source_url(), "claimed item");

            let result = AssertUnwindSafe(self.process(&item))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(DownloadError::panicked(item.key(), payload.as_ref()))
                });

            match result {
                Ok(bytes_written) => {
                    info!(url = %item.source_url(), path = %item.destination().display(), bytes = bytes_written, "download completed");
                    summary.succeeded += 1;
                    summary.bytes_written += bytes_written;
                    let outcome = DownloadOutcome::Success { bytes_written };
                    notify("on_item_complete", || {
                        self.progress.on_item_complete(&item, &outcome);
                    });
                }
                Err(e) if e.is_cancelled() => {
                    info!(url = %item.source_url(), "download abandoned by cancellation");
                    summary.interrupted = true;
                    summary.abandoned += 1;
                    break;
                }
                Err(e) => {
                    let kind = e.kind();
                    warn!(url = %item.source_url(), kind = %kind, error = %e, "download failed");
                    let outcome = DownloadOutcome::Failure {
                        kind,
                        message: e.to_string(),
                    };
                    notify("on_item_complete", || {
                        self.progress.on_item_complete(&item, &outcome);
                    });
                    summary.failed += 1;
                    summary.failed_items.push(FailedItem {
                        item,
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(worker = self.id, "worker exiting");
        summary
    }

    /// Downloads one item and records it. The ledger is touched only after
    /// the finished file has been renamed into place.
    async fn process(&self, item: &WorkItem) -> Result<u64, DownloadError> {
        let stream = tokio::select! {
            biased;
            () = cancellation(&self.interrupted) => {
                return Err(DownloadError::cancelled(item.key()));
            }
            opened = self.fetcher.open(item.source_url()) => opened?,
        };
        let bytes = self.write_to_destination(item, stream).await?;

        self.ledger
            .record_completed(item.key())
            .await
            .map_err(|e| DownloadError::ledger(item.key(), e.to_string()))?;
        Ok(bytes)
    }

    async fn write_to_destination(
        &self,
        item: &WorkItem,
        stream: ResourceStream,
    ) -> Result<u64, DownloadError> {
        let destination = item.destination();
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let partial = partial_path(destination);
        let announced = stream.content_length;
        let bytes = self.stream_to_file(item, stream, &partial).await?;

        match announced {
            Some(expected) if expected != bytes => {
                return Err(DownloadError::integrity(&partial, expected, bytes));
            }
            None if bytes == 0 => return Err(DownloadError::empty_body(item.key())),
            _ => {}
        }

        tokio::fs::rename(&partial, destination)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;
        Ok(bytes)
    }

    /// Streams the body into `partial`, truncating any leftover from an
    /// earlier attempt. Returns bytes written once they are on disk.
    ///
    /// The listing's size hint only feeds progress; integrity is checked
    /// against the server's announced length alone.
    async fn stream_to_file(
        &self,
        item: &WorkItem,
        mut stream: ResourceStream,
        partial: &Path,
    ) -> Result<u64, DownloadError> {
        let total = stream.content_length.or(item.size_hint());
        let file = File::create(partial)
            .await
            .map_err(|e| DownloadError::io(partial, e))?;
        let mut writer = BufWriter::new(file);
        let mut bytes_written: u64 = 0;

        loop {
            let next = tokio::select! {
                biased;
                () = cancellation(&self.interrupted) => {
                    if let Err(e) = writer.flush().await {
                        debug!(path = %partial.display(), error = %e, "flush of abandoned partial failed");
                    }
                    return Err(DownloadError::cancelled(item.key()));
                }
                next = stream.chunks.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(partial, e))?;
            bytes_written += chunk.len() as u64;
            notify("on_bytes", || self.progress.on_bytes(item, bytes_written, total));
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(partial, e))?;
        writer
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| DownloadError::io(partial, e))?;

        Ok(bytes_written)
    }
}

/// Resolves once the interrupt flag is raised, polling while it is not.
async fn cancellation(interrupted: &AtomicBool) {
    while !interrupted.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(CANCEL_POLL_INTERVAL_MS)).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_new_valid_concurrency() {
        assert_eq!(DownloadEngine::new(1).unwrap().concurrency(), 1);
        assert_eq!(DownloadEngine::new(7).unwrap().concurrency(), 7);
        assert_eq!(DownloadEngine::new(100).unwrap().concurrency(), 100);
    }

    #[test]
    fn test_engine_new_invalid_concurrency_zero() {
        assert!(matches!(
            DownloadEngine::new(0),
            Err(EngineError::InvalidConcurrency { value: 0 })
        ));
    }

    #[test]
    fn test_engine_new_invalid_concurrency_too_high() {
        assert!(matches!(
            DownloadEngine::new(101),
            Err(EngineError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_engine_default_uses_default_concurrency() {
        assert_eq!(DownloadEngine::default().concurrency(), DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_engine_error_display() {
        let msg = EngineError::InvalidConcurrency { value: 0 }.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_summary_merge_and_completion() {
        let mut summary = RunSummary::default();
        assert!(summary.is_complete());

        summary.merge(RunSummary {
            succeeded: 2,
            bytes_written: 10,
            ..RunSummary::default()
        });
        summary.merge(RunSummary {
            failed: 1,
            ..RunSummary::default()
        });
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.bytes_written, 10);
        assert!(!summary.is_complete());

        let interrupted = RunSummary {
            interrupted: true,
            ..RunSummary::default()
        };
        assert!(!interrupted.is_complete());

        let lost = RunSummary {
            lost_workers: 1,
            ..RunSummary::default()
        };
        assert!(!lost.is_complete());
    }

    #[tokio::test]
    async fn test_cancellation_resolves_once_flag_is_raised() {
        let flag = Arc::new(AtomicBool::new(false));
        let raiser = Arc::clone(&flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            raiser.store(true, Ordering::SeqCst);
        });
        tokio::time::timeout(Duration::from_secs(5), cancellation(&flag))
            .await
            .unwrap();
    }

    #[test]
    fn test_outcome_is_success() {
        assert!(DownloadOutcome::Success { bytes_written: 0 }.is_success());
        assert!(
            !DownloadOutcome::Failure {
                kind: FailureKind::Network,
                message: String::new(),
            }
            .is_success()
        );
    }
}
