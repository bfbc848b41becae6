//! Drives one run: load state, discover, queue, download, settle state.
//!
//! The orchestrator owns the order of operations and the decision of what
//! happens to the state file afterwards. Everything per item is delegated to
//! the worker pool; only setup problems (an unusable download or state
//! directory, a bad worker count) abort the run.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::{ConfigError, CrawlConfig};
use crate::discovery::{DiscoveryError, DiscoveryReport, discover};
use crate::download::{DownloadEngine, EngineError, Fetcher, RunSummary};
use crate::ledger::StateLedger;
use crate::progress::{ProgressSink, notify};
use crate::queue::{DestinationCollision, WorkItem, WorkQueue};

/// Problems that stop a run before any download starts.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Worker pool could not be built.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A directory the run needs could not be created.
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// How a finished run should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every candidate is on disk and every listing was scanned.
    Complete,
    /// Something was left behind; re-running resumes.
    Partial,
}

/// Everything the caller needs to summarize a run.
#[derive(Debug)]
pub struct RunReport {
    /// Unique candidates found by discovery.
    pub discovered: usize,
    /// Candidates skipped because the ledger already had them.
    pub already_completed: usize,
    /// Items handed to the worker pool.
    pub queued: usize,
    /// Listings that could not be scanned.
    pub discovery_failures: Vec<DiscoveryError>,
    /// Candidates skipped because another URL owns their destination.
    pub collisions: Vec<DestinationCollision>,
    /// Worker pool totals.
    pub summary: RunSummary,
    /// True when the state file was removed at the end of the run.
    pub ledger_cleared: bool,
}

impl RunReport {
    /// Complete only when nothing failed, nothing was interrupted, and
    /// every listing was scanned.
    #[must_use]
    pub fn outcome(&self) -> RunOutcome {
        if self.summary.is_complete() && self.discovery_failures.is_empty() {
            RunOutcome::Complete
        } else {
            RunOutcome::Partial
        }
    }
}

/// What a run would download, without downloading it.
#[derive(Debug)]
pub struct RunPlan {
    /// Unique candidates found by discovery.
    pub discovered: usize,
    /// Candidates the ledger already has.
    pub already_completed: usize,
    /// Items a run would queue, sorted by source URL.
    pub pending: Vec<WorkItem>,
    /// Listings that could not be scanned.
    pub discovery_failures: Vec<DiscoveryError>,
    /// Candidates skipped because another URL owns their destination.
    pub collisions: Vec<DestinationCollision>,
}

/// Wires configuration, fetcher and progress sink into a run.
pub struct Orchestrator {
    config: CrawlConfig,
    fetcher: Arc<dyn Fetcher>,
    progress: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator for one configuration.
    #[must_use]
    pub fn new(
        config: CrawlConfig,
        fetcher: Arc<dyn Fetcher>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            fetcher,
            progress,
        }
    }

    /// Configuration this orchestrator runs with.
    #[must_use]
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs the whole pipeline once.
    ///
    /// Per-item and per-listing failures are reported in the returned
    /// [`RunReport`]; they never make this method fail.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the configuration is invalid or the
    /// download or state directory cannot be created.
    #[instrument(skip_all, fields(release = %self.config.release))]
    pub async fn run(&self, interrupted: Arc<AtomicBool>) -> Result<RunReport, SetupError> {
        self.config.validate()?;
        let engine = DownloadEngine::new(self.config.concurrency)?;
        create_dir(&self.config.download_root).await?;
        create_dir(&self.config.state_dir).await?;

        let ledger = Arc::new(StateLedger::load(self.config.state_file(), &self.config.release).await);
        let completed = ledger.completed().await;

        let discovery = self.discover().await;
        let discovered = discovery.items.len();
        let discovery_failures = discovery.failures;

        if discovered == 0 {
            info!("no matching files found; nothing to download");
            return Ok(RunReport {
                discovered,
                already_completed: 0,
                queued: 0,
                discovery_failures,
                collisions: Vec::new(),
                summary: RunSummary::default(),
                ledger_cleared: false,
            });
        }

        let queue = Arc::new(WorkQueue::from_candidates(discovery.items, &completed));
        let queued = queue.initial_len();
        let already_completed = queue.already_completed();
        let collisions = queue.collisions().to_vec();
        info!(
            total = discovered,
            already_completed,
            to_download = queued,
            "Found {discovered} total files, {queued} to download"
        );
        notify("on_queue_ready", || self.progress.on_queue_ready(queued));

        let summary = engine
            .run(
                queue,
                Arc::clone(&self.fetcher),
                Arc::clone(&ledger),
                Arc::clone(&self.progress),
                interrupted,
            )
            .await;

        let mut report = RunReport {
            discovered,
            already_completed,
            queued,
            discovery_failures,
            collisions,
            summary,
            ledger_cleared: false,
        };

        if report.outcome() == RunOutcome::Complete && !self.config.keep_state {
            match ledger.clear().await {
                Ok(()) => {
                    info!(path = %ledger.path().display(), "all files downloaded; state cleared");
                    report.ledger_cleared = true;
                }
                Err(e) => warn!(error = %e, "could not remove state file"),
            }
        } else if report.outcome() == RunOutcome::Partial {
            info!(
                failed = report.summary.failed,
                abandoned = report.summary.abandoned,
                lost_workers = report.summary.lost_workers,
                path = %ledger.path().display(),
                "keeping state for the next run"
            );
        }

        Ok(report)
    }

    /// Discovers candidates and subtracts the ledger without downloading
    /// anything or touching the state file.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Config`] if the configuration is invalid.
    #[instrument(skip_all, fields(release = %self.config.release))]
    pub async fn plan(&self) -> Result<RunPlan, SetupError> {
        self.config.validate()?;
        let ledger = StateLedger::load(self.config.state_file(), &self.config.release).await;
        let completed = ledger.completed().await;

        let discovery = self.discover().await;
        let discovered = discovery.items.len();
        let queue = WorkQueue::from_candidates(discovery.items, &completed);
        let already_completed = queue.already_completed();
        let collisions = queue.collisions().to_vec();
        let pending: Vec<WorkItem> = std::iter::from_fn(|| queue.claim()).collect();

        Ok(RunPlan {
            discovered,
            already_completed,
            pending,
            discovery_failures: discovery.failures,
            collisions,
        })
    }

    async fn discover(&self) -> DiscoveryReport {
        discover(
            self.fetcher.as_ref(),
            &self.config.listings,
            &self.config.base_url,
            &self.config.suffix,
            &self.config.download_root,
            self.progress.as_ref(),
        )
        .await
    }
}

async fn create_dir(path: &std::path::Path) -> Result<(), SetupError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| SetupError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}
