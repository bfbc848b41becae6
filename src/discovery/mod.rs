//! Link discovery across the configured listing pages.
//!
//! Each listing identifier is joined onto the release base URL, fetched as
//! text, and scanned for anchors whose path ends with the configured suffix.
//! A listing that cannot be fetched is logged and skipped; the rest of the
//! scan continues. The result is the deduplicated, sorted candidate set.
//!
//! Discovery finishes before any download starts, so the work queue is fixed
//! by the time workers run.

mod error;
mod links;

pub use error::DiscoveryError;
pub use links::{ListingEntry, extract_entries, extract_links, has_suffix};

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::download::Fetcher;
use crate::progress::{ProgressSink, notify};
use crate::queue::WorkItem;

/// Outcome of scanning every listing.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Unique candidate items, sorted by source URL.
    pub items: Vec<WorkItem>,
    /// Listings that could not be scanned.
    pub failures: Vec<DiscoveryError>,
    /// Listings fetched and parsed successfully.
    pub listings_scanned: usize,
}

/// Scans `listings` under `base_url` and returns every unique link ending in `suffix`.
///
/// `base_url` must end with `/` for listing identifiers to join beneath it.
/// Links without a usable file name are dropped.
#[instrument(skip_all, fields(base_url = %base_url, listings = listings.len(), suffix))]
pub async fn discover(
    fetcher: &dyn Fetcher,
    listings: &[String],
    base_url: &Url,
    suffix: &str,
    download_root: &Path,
    progress: &dyn ProgressSink,
) -> DiscoveryReport {
    let mut unique: BTreeSet<WorkItem> = BTreeSet::new();
    let mut report = DiscoveryReport::default();

    for listing in listings {
        let listing_url = match base_url.join(listing) {
            Ok(url) => url,
            Err(source) => {
                warn!(listing = %listing, error = %source, "skipping invalid listing");
                report.failures.push(DiscoveryError::InvalidListingUrl {
                    listing: listing.clone(),
                    source,
                });
                notify("on_listing_scanned", || progress.on_listing_scanned(listing, 0));
                continue;
            }
        };

        let body = match fetcher.fetch_text(&listing_url).await {
            Ok(body) => body,
            Err(source) => {
                warn!(listing = %listing_url, error = %source, "could not fetch listing");
                report.failures.push(DiscoveryError::Fetch {
                    listing: listing.clone(),
                    source,
                });
                notify("on_listing_scanned", || progress.on_listing_scanned(listing, 0));
                continue;
            }
        };

        let mut found = 0;
        for entry in extract_entries(&body, &listing_url) {
            if !has_suffix(&entry.url, suffix) {
                continue;
            }
            found += 1;
            match WorkItem::from_url(entry.url, download_root) {
                Some(item) => {
                    unique.insert(item.with_size_hint(entry.size_hint));
                }
                None => debug!(listing = %listing_url, "skipping link without a file name"),
            }
        }

        debug!(listing = %listing_url, found, "listing scanned");
        report.listings_scanned += 1;
        notify("on_listing_scanned", || progress.on_listing_scanned(listing, found));
    }

    report.items = unique.into_iter().collect();
    info!(
        candidates = report.items.len(),
        scanned = report.listings_scanned,
        skipped = report.failures.len(),
        "discovery finished"
    );
    report
}
