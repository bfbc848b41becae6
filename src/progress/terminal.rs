//! Terminal progress bars (indicatif) for interactive runs.

use dashmap::DashMap;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::{ProgressAggregator, ProgressSink, ProgressSnapshot};
use crate::download::{DownloadOutcome, RunSummary};
use crate::queue::WorkItem;

const SCAN_STYLE: &str = "{spinner} Scanning listings [{bar:30}] {pos}/{len} {msg}";
const OVERALL_STYLE: &str = "Overall progress [{bar:30}] {pos}/{len} ({eta})";
const FILE_STYLE: &str = "  {msg:30!} [{bar:25}] {bytes}/{total_bytes} {bytes_per_sec}";
const FILE_SPINNER_STYLE: &str = "  {spinner} {msg:30!} {bytes} {bytes_per_sec}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Renders a listing-scan bar, an overall item bar, and one transient byte
/// bar per in-flight download. Counts are mirrored into an inner
/// [`ProgressAggregator`].
#[derive(Debug)]
pub struct TerminalProgress {
    multi: MultiProgress,
    scan: ProgressBar,
    overall: ProgressBar,
    files: DashMap<String, ProgressBar>,
    counters: ProgressAggregator,
}

impl TerminalProgress {
    /// Creates the bar set for a run scanning `listings` listing pages.
    #[must_use]
    pub fn new(listings: usize) -> Self {
        let multi = MultiProgress::new();
        let scan = multi.add(ProgressBar::new(listings as u64));
        scan.set_style(style(SCAN_STYLE));
        let overall = ProgressBar::new(0);
        overall.set_style(style(OVERALL_STYLE));

        Self {
            multi,
            scan,
            overall,
            files: DashMap::new(),
            counters: ProgressAggregator::new(),
        }
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.counters.snapshot()
    }

    fn file_bar(&self, item: &WorkItem, total_bytes: Option<u64>) -> ProgressBar {
        self.files
            .entry(item.key().to_string())
            .or_insert_with(|| {
                let bar = match total_bytes {
                    Some(total) => {
                        let bar = ProgressBar::new(total);
                        bar.set_style(style(FILE_STYLE));
                        bar
                    }
                    None => {
                        let bar = ProgressBar::new_spinner();
                        bar.set_style(style(FILE_SPINNER_STYLE));
                        bar
                    }
                };
                bar.set_message(item.display_name());
                self.multi.add(bar)
            })
            .clone()
    }
}

impl ProgressSink for TerminalProgress {
    fn on_listing_scanned(&self, listing: &str, found: usize) {
        self.counters.on_listing_scanned(listing, found);
        self.scan.set_message(listing.to_string());
        self.scan.inc(1);
    }

    fn on_queue_ready(&self, queued: usize) {
        self.counters.on_queue_ready(queued);
        self.scan.finish_and_clear();
        let overall = self.multi.add(self.overall.clone());
        overall.set_length(queued as u64);
    }

    fn on_bytes(&self, item: &WorkItem, bytes_so_far: u64, total_bytes: Option<u64>) {
        self.counters.on_bytes(item, bytes_so_far, total_bytes);
        self.file_bar(item, total_bytes).set_position(bytes_so_far);
    }

    fn on_item_complete(&self, item: &WorkItem, outcome: &DownloadOutcome) {
        self.counters.on_item_complete(item, outcome);
        if let Some((_, bar)) = self.files.remove(item.key()) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
        if let DownloadOutcome::Failure { message, .. } = outcome {
            let _ = self.multi.println(format!("failed: {message}"));
        }
        self.overall.inc(1);
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        for entry in self.files.iter() {
            entry.value().finish_and_clear();
        }
        self.files.clear();
        self.overall.finish_with_message(format!(
            "{} downloaded, {} failed",
            summary.succeeded, summary.failed
        ));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use url::Url;

    use super::*;
    use crate::download::FailureKind;

    fn item(name: &str) -> WorkItem {
        let url = Url::parse(&format!("https://example.com/s/{name}")).unwrap();
        WorkItem::from_url(url, Path::new("out")).unwrap()
    }

    #[test]
    fn test_terminal_progress_tracks_counts_and_drops_finished_bars() {
        let progress = TerminalProgress::new(2);
        progress.on_listing_scanned("21_series/", 1);
        progress.on_listing_scanned("22_series/", 1);
        progress.on_queue_ready(2);

        let a = item("a.zip");
        let b = item("b.zip");
        progress.on_bytes(&a, 5, Some(10));
        progress.on_bytes(&b, 3, None);
        assert_eq!(progress.files.len(), 2);

        progress.on_item_complete(&a, &DownloadOutcome::Success { bytes_written: 10 });
        progress.on_item_complete(
            &b,
            &DownloadOutcome::Failure {
                kind: FailureKind::HttpStatus,
                message: "HTTP 404".to_string(),
            },
        );
        assert!(progress.files.is_empty());

        let snap = progress.snapshot();
        assert_eq!(snap.links_found, 2);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.bytes, 8);

        progress.on_run_complete(&RunSummary::default());
    }
}
