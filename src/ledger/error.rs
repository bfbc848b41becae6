//! Error types for the state ledger.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or persisting the ledger file.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The state file (or its temporary sibling) could not be read or written.
    #[error("state file IO error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The state file contents are not a valid ledger record.
    #[error("state file {path} is not valid JSON: {source}")]
    Corrupt {
        /// Path of the unreadable file.
        path: PathBuf,
        /// JSON decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The state file belongs to a different release.
    #[error("state file {path} records release {found}, expected {expected}")]
    ReleaseMismatch {
        /// Path of the foreign file.
        path: PathBuf,
        /// Release stored in the file.
        found: String,
        /// Release this run targets.
        expected: String,
    },
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            path: path.into(),
            source,
        }
    }
}
