//! Constants for the download module (timeouts, concurrency bounds).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (2 minutes of silence on an open transfer).
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Default number of download workers.
pub const DEFAULT_CONCURRENCY: usize = 7;

/// Suffix appended to a destination path while its transfer is in flight.
pub const PARTIAL_SUFFIX: &str = "part";

/// How often a worker blocked on the network re-checks the interrupt flag.
pub const CANCEL_POLL_INTERVAL_MS: u64 = 50;
