//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns so a failure can be
//! reported per item without extra bookkeeping.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching a listing page or an archive.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The response body stopped before the transfer finished.
    #[error("transfer of {url} aborted: {reason}")]
    StreamAborted {
        /// The URL being transferred.
        url: String,
        /// What ended the stream.
        reason: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create dir, create file, write, rename).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Downloaded file size does not match the server's content length.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Integrity {
        /// Partial file that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },

    /// The server announced no length and sent nothing.
    #[error("empty body downloading {url}")]
    EmptyBody {
        /// The URL that returned no bytes.
        url: String,
    },

    /// The ledger could not durably record a finished transfer.
    #[error("could not record {url} as completed: {message}")]
    Ledger {
        /// The URL whose completion was lost.
        url: String,
        /// Ledger error text.
        message: String,
    },

    /// Code handling this item panicked; the panic was contained to the item.
    #[error("download of {url} panicked: {message}")]
    Panicked {
        /// The URL being processed.
        url: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// The run was cancelled while this transfer was in flight.
    #[error("download of {url} cancelled")]
    Cancelled {
        /// The URL that was abandoned.
        url: String,
    },
}

/// Per-item failure category surfaced in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Connect, timeout, reset, or truncated body. A later run may succeed.
    Network,
    /// Server answered with a non-success status.
    HttpStatus,
    /// Destination could not be created, written, renamed, or recorded.
    FileSystem,
    /// A bug surfaced as a panic while handling the item.
    Internal,
}

impl FailureKind {
    /// Stable label used in logs and summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::FileSystem => "filesystem",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DownloadError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a stream-aborted error.
    pub fn stream_aborted(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StreamAborted {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates an empty-body error.
    pub fn empty_body(url: impl Into<String>) -> Self {
        Self::EmptyBody { url: url.into() }
    }

    /// Creates an error from a caught panic payload.
    pub fn panicked(url: impl Into<String>, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked {
            url: url.into(),
            message,
        }
    }

    /// Creates a ledger write error.
    pub fn ledger(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ledger {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns true when the transfer was abandoned because the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Maps the error onto the per-item failure taxonomy.
    ///
    /// A truncated body is a network fault: the bytes never arrived, the
    /// disk did nothing wrong. Cancellation is reported as `Network` when a
    /// caller asks, but the engine never records it as a failure.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. }
            | Self::Timeout { .. }
            | Self::StreamAborted { .. }
            | Self::Integrity { .. }
            | Self::EmptyBody { .. }
            | Self::Cancelled { .. } => FailureKind::Network,
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::Io { .. } | Self::Ledger { .. } => FailureKind::FileSystem,
            Self::Panicked { .. } => FailureKind::Internal,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path the source error does not carry.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_timeout_display() {
        let error = DownloadError::timeout("https://example.com/21_series/21101-i00.zip");
        let msg = error.to_string();
        assert!(msg.contains("timeout"));
        assert!(msg.contains("21101-i00.zip"));
    }

    #[test]
    fn test_download_error_http_status_display() {
        let error = DownloadError::http_status("https://example.com/a.zip", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/a.zip"), "Expected URL in: {msg}");
    }

    #[test]
    fn test_download_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/a.zip.part"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/a.zip.part"), "Expected path in: {msg}");
    }

    #[test]
    fn test_download_error_integrity_display() {
        let error = DownloadError::integrity("/tmp/a.zip.part", 100, 42);
        let msg = error.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_kind_maps_transport_faults_to_network() {
        assert_eq!(
            DownloadError::timeout("https://x/a.zip").kind(),
            FailureKind::Network
        );
        assert_eq!(
            DownloadError::stream_aborted("https://x/a.zip", "reset").kind(),
            FailureKind::Network
        );
        assert_eq!(
            DownloadError::integrity("/tmp/a", 2, 1).kind(),
            FailureKind::Network
        );
    }

    #[test]
    fn test_kind_maps_status_and_disk_faults() {
        assert_eq!(
            DownloadError::http_status("https://x/a.zip", 500).kind(),
            FailureKind::HttpStatus
        );
        let io_error = std::io::Error::other("disk full");
        assert_eq!(
            DownloadError::io("/tmp/a", io_error).kind(),
            FailureKind::FileSystem
        );
        assert_eq!(
            DownloadError::ledger("https://x/a.zip", "read-only").kind(),
            FailureKind::FileSystem
        );
    }

    #[test]
    fn test_cancelled_is_flagged() {
        assert!(DownloadError::cancelled("https://x/a.zip").is_cancelled());
        assert!(!DownloadError::timeout("https://x/a.zip").is_cancelled());
    }

    #[test]
    fn test_failure_kind_labels() {
        assert_eq!(FailureKind::Network.to_string(), "network");
        assert_eq!(FailureKind::HttpStatus.to_string(), "http_status");
        assert_eq!(FailureKind::FileSystem.to_string(), "filesystem");
        assert_eq!(FailureKind::Internal.to_string(), "internal");
    }

    #[test]
    fn test_panicked_keeps_string_payloads() {
        let literal: Box<dyn std::any::Any + Send> = Box::new("boom");
        let error = DownloadError::panicked("https://x/a.zip", literal.as_ref());
        assert!(error.to_string().contains("boom"));
        assert_eq!(error.kind(), FailureKind::Internal);

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert!(
            DownloadError::panicked("https://x/a.zip", owned.as_ref())
                .to_string()
                .contains("owned boom")
        );

        let opaque: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert!(
            DownloadError::panicked("https://x/a.zip", opaque.as_ref())
                .to_string()
                .contains("non-string")
        );
    }

    #[test]
    fn test_empty_body_is_a_network_fault() {
        let error = DownloadError::empty_body("https://x/a.zip");
        assert_eq!(error.kind(), FailureKind::Network);
        assert!(error.to_string().contains("empty body"));
    }
}
