//! Progress events emitted by discovery and the download engine.
//!
//! The pipeline reports through the [`ProgressSink`] trait and never reads
//! anything back, so rendering can be swapped out (terminal bars, counters
//! only, nothing at all) without touching the concurrency core. Sinks are
//! called from every worker concurrently and must not block or fail.

mod terminal;

pub use terminal::TerminalProgress;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::warn;

use crate::download::{DownloadOutcome, RunSummary};
use crate::queue::WorkItem;

/// Observer for pipeline progress. Every method defaults to a no-op.
pub trait ProgressSink: Send + Sync {
    /// A listing page was scanned; `found` matching links on it.
    fn on_listing_scanned(&self, _listing: &str, _found: usize) {}

    /// The download set is fixed: `queued` items are about to start.
    fn on_queue_ready(&self, _queued: usize) {}

    /// Bytes written so far for `item`, with the total when the server announced one.
    fn on_bytes(&self, _item: &WorkItem, _bytes_so_far: u64, _total_bytes: Option<u64>) {}

    /// `item` finished, successfully or not.
    fn on_item_complete(&self, _item: &WorkItem, _outcome: &DownloadOutcome) {}

    /// The worker pool has drained.
    fn on_run_complete(&self, _summary: &RunSummary) {}
}

/// Delivers one event to a sink, containing any panic inside it.
///
/// A misbehaving sink loses the event; the caller carries on.
pub(crate) fn notify(event: &'static str, deliver: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(deliver)).is_err() {
        warn!(event, "progress sink panicked; event dropped");
    }
}

/// Sink that ignores every event (quiet mode, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Point-in-time copy of the aggregator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Matching links seen across scanned listings (before deduplication).
    pub links_found: usize,
    /// Items queued for this run.
    pub queued: usize,
    /// Bytes written across all items, including failed attempts.
    pub bytes: u64,
    /// Items completed successfully.
    pub succeeded: usize,
    /// Items that failed.
    pub failed: usize,
}

impl ProgressSnapshot {
    /// Items finished either way.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Lock-free counters fed by progress events.
///
/// Byte counts arrive as running totals per item; the aggregator adds the
/// positive delta to the overall total, which assumes each item's events
/// arrive from a single worker in order.
#[derive(Debug, Default)]
pub struct ProgressAggregator {
    links_found: AtomicUsize,
    queued: AtomicUsize,
    bytes: AtomicU64,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    in_flight: dashmap::DashMap<String, u64>,
}

impl ProgressAggregator {
    /// Creates an aggregator with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            links_found: self.links_found.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl ProgressSink for ProgressAggregator {
    fn on_listing_scanned(&self, _listing: &str, found: usize) {
        self.links_found.fetch_add(found, Ordering::Relaxed);
    }

    fn on_queue_ready(&self, queued: usize) {
        self.queued.store(queued, Ordering::Relaxed);
    }

    fn on_bytes(&self, item: &WorkItem, bytes_so_far: u64, _total_bytes: Option<u64>) {
        let mut seen = self.in_flight.entry(item.key().to_string()).or_insert(0);
        let delta = bytes_so_far.saturating_sub(*seen);
        *seen = bytes_so_far.max(*seen);
        drop(seen);
        self.bytes.fetch_add(delta, Ordering::Relaxed);
    }

    fn on_item_complete(&self, item: &WorkItem, outcome: &DownloadOutcome) {
        self.in_flight.remove(item.key());
        if outcome.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::download::FailureKind;

    fn item(name: &str) -> WorkItem {
        let url = Url::parse(&format!("https://example.com/s/{name}")).unwrap();
        WorkItem::from_url(url, Path::new("out")).unwrap()
    }

    #[test]
    fn test_no_progress_accepts_every_event() {
        let sink = NoProgress;
        let item = item("a.zip");
        sink.on_listing_scanned("21_series/", 3);
        sink.on_bytes(&item, 10, Some(20));
        sink.on_item_complete(&item, &DownloadOutcome::Success { bytes_written: 20 });
        sink.on_run_complete(&RunSummary::default());
    }

    #[test]
    fn test_aggregator_counts_outcomes() {
        let agg = ProgressAggregator::new();
        let a = item("a.zip");
        let b = item("b.zip");
        agg.on_queue_ready(2);
        agg.on_item_complete(&a, &DownloadOutcome::Success { bytes_written: 1 });
        agg.on_item_complete(
            &b,
            &DownloadOutcome::Failure {
                kind: FailureKind::Network,
                message: "reset".to_string(),
            },
        );

        let snap = agg.snapshot();
        assert_eq!(snap.queued, 2);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.finished(), 2);
    }

    #[test]
    fn test_aggregator_sums_byte_deltas() {
        let agg = ProgressAggregator::new();
        let a = item("a.zip");
        let b = item("b.zip");
        agg.on_bytes(&a, 100, Some(300));
        agg.on_bytes(&b, 50, None);
        agg.on_bytes(&a, 300, Some(300));
        assert_eq!(agg.snapshot().bytes, 350);
    }

    #[test]
    fn test_aggregator_counts_links() {
        let agg = ProgressAggregator::new();
        agg.on_listing_scanned("21_series/", 2);
        agg.on_listing_scanned("22_series/", 3);
        assert_eq!(agg.snapshot().links_found, 5);
    }

    #[test]
    fn test_aggregator_is_consistent_under_concurrency() {
        let agg = Arc::new(ProgressAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let item = item(&format!("{worker}-{i}.zip"));
                        agg.on_bytes(&item, 10, Some(10));
                        agg.on_item_complete(&item, &DownloadOutcome::Success { bytes_written: 10 });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = agg.snapshot();
        assert_eq!(snap.succeeded, 400);
        assert_eq!(snap.bytes, 4000);
    }

    #[test]
    fn test_notify_contains_sink_panics() {
        let mut delivered = false;
        notify("on_bytes", || delivered = true);
        assert!(delivered);

        notify("on_bytes", || panic!("sink bug"));
    }
}
