//! Durable record of completed downloads.
//!
//! The ledger is a set of source URLs, each added only after its archive has
//! been written in full and renamed into place. It lives in one JSON file per
//! release and every update replaces that file whole (write a temporary
//! sibling, `fsync`, rename), so a crash at any point leaves either the old
//! set or the new one on disk, never a torn record.
//!
//! Loading never fails the run: a missing, unreadable, or foreign file is
//! treated as "nothing completed yet".
//!
//! # Example
//!
//! ```no_run
//! use specfetch_core::ledger::StateLedger;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = StateLedger::load("download_state_rel-18.json", "18").await;
//! ledger.record_completed("https://example.com/21_series/a.zip").await?;
//! assert!(ledger.contains("https://example.com/21_series/a.zip").await);
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::LedgerError;

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// On-disk shape of the state file.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerRecord {
    release: String,
    completed: BTreeSet<String>,
}

#[derive(Serialize)]
struct LedgerRecordRef<'a> {
    release: &'a str,
    completed: &'a BTreeSet<String>,
}

/// File name of the state file for a release, e.g. `download_state_rel-18.json`.
#[must_use]
pub fn state_file_name(release: &str) -> String {
    format!("download_state_rel-{release}.json")
}

/// Single-writer durable set of completed source URLs.
///
/// All writes go through one async mutex held across the file replacement,
/// so concurrent workers never interleave partial updates or lose a key.
#[derive(Debug)]
pub struct StateLedger {
    path: PathBuf,
    release: String,
    completed: Mutex<BTreeSet<String>>,
}

impl StateLedger {
    /// Loads the ledger from `path`, or starts empty.
    ///
    /// Missing file, unreadable file, corrupt JSON, and a file recorded for
    /// another release all yield an empty ledger; the latter three log a warning.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), release = %release))]
    pub async fn load(path: impl AsRef<Path>, release: &str) -> Self {
        let path = path.as_ref().to_path_buf();
        let completed = match Self::read_record(&path, release).await {
            Ok(Some(completed)) => {
                info!(completed = completed.len(), "resuming from saved state");
                completed
            }
            Ok(None) => {
                debug!("no saved state; starting fresh");
                BTreeSet::new()
            }
            Err(e) => {
                warn!(error = %e, "ignoring unusable state file; starting fresh");
                BTreeSet::new()
            }
        };

        Self {
            path,
            release: release.to_string(),
            completed: Mutex::new(completed),
        }
    }

    /// Reads the state file strictly, reporting why it cannot be used.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] for IO failures, invalid JSON, or a release mismatch.
    pub async fn read_record(
        path: &Path,
        release: &str,
    ) -> Result<Option<BTreeSet<String>>, LedgerError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LedgerError::io(path, e)),
        };
        let record: LedgerRecord =
            serde_json::from_slice(&raw).map_err(|e| LedgerError::corrupt(path, e))?;
        if record.release != release {
            return Err(LedgerError::ReleaseMismatch {
                path: path.to_path_buf(),
                found: record.release,
                expected: release.to_string(),
            });
        }
        Ok(Some(record.completed))
    }

    /// Path of the backing state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the completed keys.
    pub async fn completed(&self) -> BTreeSet<String> {
        self.completed.lock().await.clone()
    }

    /// Returns true if `key` has been recorded as completed.
    pub async fn contains(&self, key: &str) -> bool {
        self.completed.lock().await.contains(key)
    }

    /// Number of completed keys.
    pub async fn len(&self) -> usize {
        self.completed.lock().await.len()
    }

    /// Returns true when nothing has been recorded.
    pub async fn is_empty(&self) -> bool {
        self.completed.lock().await.is_empty()
    }

    /// Records `key` as completed and persists the whole set before returning.
    ///
    /// Call only after the archive is fully written and in place. If the
    /// write fails, the key is rolled back so memory never claims more than
    /// disk.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the state file cannot be replaced.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn record_completed(&self, key: &str) -> Result<(), LedgerError> {
        let mut completed = self.completed.lock().await;
        let inserted = completed.insert(key.to_string());

        if let Err(e) = self.persist(&completed).await {
            if inserted {
                completed.remove(key);
            }
            error!(key, error = %e, "failed to persist completed download");
            return Err(e);
        }

        debug!(key, total = completed.len(), "recorded completed download");
        Ok(())
    }

    /// Deletes the state file and forgets every key.
    ///
    /// Only called after a run finishes with nothing left to download.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the file exists but cannot be removed.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn clear(&self) -> Result<(), LedgerError> {
        let mut completed = self.completed.lock().await;
        remove_if_present(&self.path).await?;
        remove_if_present(&temp_path(&self.path)).await?;
        completed.clear();
        info!("cleared saved state");
        Ok(())
    }

    async fn persist(&self, completed: &BTreeSet<String>) -> Result<(), LedgerError> {
        let record = LedgerRecordRef {
            release: &self.release,
            completed,
        };
        let bytes =
            serde_json::to_vec_pretty(&record).map_err(|e| LedgerError::corrupt(&self.path, e))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::io(parent, e))?;
        }

        let tmp = temp_path(&self.path);
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| LedgerError::io(&tmp, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| LedgerError::io(&tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| LedgerError::io(&tmp, e))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| LedgerError::io(&self.path, e))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("ledger"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

async fn remove_if_present(path: &Path) -> Result<(), LedgerError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LedgerError::io(path, e)),
    }
}
