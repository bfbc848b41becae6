//! Work queue handed to the download workers.
//!
//! The queue is populated once, from the discovered candidates minus the
//! keys the ledger already holds, and then only drains. Workers take items
//! through [`WorkQueue::claim`]; there is no way to add work after
//! construction.
//!
//! Every queued item owns its destination file. When two distinct URLs
//! derive the same path (a query-string variant, or the same series and
//! file name on another host), the first candidate keeps the path and the
//! rest are set aside as [`DestinationCollision`]s.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use std::path::Path;
//! use specfetch_core::queue::{WorkItem, WorkQueue};
//! use url::Url;
//!
//! let url = Url::parse("https://example.com/21_series/a.zip").unwrap();
//! let item = WorkItem::from_url(url, Path::new("out")).unwrap();
//! let queue = WorkQueue::from_candidates(vec![item], &BTreeSet::new());
//! assert_eq!(queue.len(), 1);
//! assert!(queue.claim().is_some());
//! assert!(queue.claim().is_none());
//! ```

mod item;

pub use item::WorkItem;

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

/// A candidate skipped because an earlier candidate derives the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCollision {
    /// The contested destination path.
    pub destination: PathBuf,
    /// Key of the candidate that keeps the path.
    pub kept: String,
    /// The candidate that was set aside.
    pub skipped: WorkItem,
}

/// Claim-only queue of pending work items.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
    initial_len: usize,
    already_completed: usize,
    collisions: Vec<DestinationCollision>,
}

impl WorkQueue {
    /// Builds the queue from discovery output, skipping keys already completed.
    ///
    /// Candidates keep their given order; duplicates by URL are dropped.
    /// Destinations are claimed before the completed keys are subtracted, so
    /// a pending URL can never overwrite a file another key already owns.
    #[must_use]
    pub fn from_candidates<I>(candidates: I, completed: &BTreeSet<String>) -> Self
    where
        I: IntoIterator<Item = WorkItem>,
    {
        let mut seen = BTreeSet::new();
        let mut owners: HashMap<PathBuf, String> = HashMap::new();
        let mut items = VecDeque::new();
        let mut already_completed = 0;
        let mut collisions = Vec::new();

        for item in candidates {
            if !seen.insert(item.key().to_string()) {
                continue;
            }
            if let Some(kept) = owners.get(item.destination()) {
                warn!(
                    url = %item.source_url(),
                    kept = %kept,
                    destination = %item.destination().display(),
                    "skipping link whose file is already claimed by another URL"
                );
                collisions.push(DestinationCollision {
                    destination: item.destination().to_path_buf(),
                    kept: kept.clone(),
                    skipped: item,
                });
                continue;
            }
            owners.insert(item.destination().to_path_buf(), item.key().to_string());

            if completed.contains(item.key()) {
                already_completed += 1;
            } else {
                items.push_back(item);
            }
        }

        let initial_len = items.len();
        debug!(
            queued = initial_len,
            already_completed,
            collisions = collisions.len(),
            "work queue built"
        );
        Self {
            items: Mutex::new(items),
            initial_len,
            already_completed,
            collisions,
        }
    }

    /// Takes the next item, or `None` once the queue is drained.
    ///
    /// Never blocks on other workers' transfers: the lock only guards the pop.
    pub fn claim(&self) -> Option<WorkItem> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Number of items not yet claimed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when every item has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of items the queue started with.
    #[must_use]
    pub fn initial_len(&self) -> usize {
        self.initial_len
    }

    /// Candidates left out because the ledger already had them.
    #[must_use]
    pub fn already_completed(&self) -> usize {
        self.already_completed
    }

    /// Candidates set aside because their destination was already claimed.
    #[must_use]
    pub fn collisions(&self) -> &[DestinationCollision] {
        &self.collisions
    }
}
