//! Archive transfer: the fetch seam, the worker pool, and on-disk layout.
//!
//! # Features
//!
//! - Streaming downloads into `<destination>.part`, renamed into place only
//!   after the body is complete and flushed
//! - Size verification against the server's `Content-Length`
//! - Fixed-size worker pool with cooperative cancellation
//! - Per-item failure classification (network, HTTP status, filesystem)
//!
//! # Example
//!
//! ```no_run
//! use specfetch_core::download::{Fetcher, HttpClient};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let url = Url::parse("https://www.3gpp.org/ftp/Specs/latest/Rel-18/21_series/")?;
//! let listing = client.fetch_text(&url).await?;
//! println!("{} bytes of listing", listing.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
mod filename;

pub use client::{Fetcher, HttpClient, ResourceStream};
pub use constants::{
    CANCEL_POLL_INTERVAL_MS, CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY, PARTIAL_SUFFIX,
    READ_TIMEOUT_SECS,
};
pub use engine::{DownloadEngine, DownloadOutcome, EngineError, FailedItem, RunSummary};
pub use error::{DownloadError, FailureKind};
pub use filename::{destination_for, partial_path};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
