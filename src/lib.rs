//! Specfetch Core Library
//!
//! Resumable bulk download of a release's specification archives: scan a
//! fixed set of directory listings, download every matching archive with a
//! bounded worker pool, and record each completed file in a durable state
//! ledger so an interrupted or partially failed run resumes where it stopped.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Immutable run configuration and validation
//! - [`discovery`] - Listing scan and link extraction
//! - [`download`] - Fetch seam, HTTP client, and the worker pool
//! - [`ledger`] - Durable set of completed downloads
//! - [`orchestrator`] - One run from state load to state cleanup
//! - [`progress`] - Progress event sink, counters, and terminal bars
//! - [`queue`] - Work items and the claim-only work queue

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod discovery;
pub mod download;
pub mod ledger;
pub mod orchestrator;
pub mod progress;
pub mod queue;
mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, CrawlConfig};
pub use download::{
    DEFAULT_CONCURRENCY, DownloadEngine, DownloadError, DownloadOutcome, EngineError, FailureKind,
    Fetcher, HttpClient, RunSummary,
};
pub use ledger::{LedgerError, StateLedger};
pub use orchestrator::{Orchestrator, RunOutcome, RunReport, SetupError};
pub use progress::{NoProgress, ProgressAggregator, ProgressSink, TerminalProgress};
pub use queue::{WorkItem, WorkQueue};
