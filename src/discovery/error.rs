//! Error types for listing discovery.

use thiserror::Error;

use crate::download::DownloadError;

/// A listing page that could not be scanned. Never fatal to the run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The listing identifier does not join onto the base URL.
    #[error("invalid listing '{listing}': {source}")]
    InvalidListingUrl {
        /// Listing identifier as configured.
        listing: String,
        /// URL join error.
        #[source]
        source: url::ParseError,
    },

    /// The listing page could not be fetched.
    #[error("could not fetch listing '{listing}': {source}")]
    Fetch {
        /// Listing identifier as configured.
        listing: String,
        /// Underlying fetch error.
        #[source]
        source: DownloadError,
    },
}

impl DiscoveryError {
    /// Listing identifier this error concerns.
    #[must_use]
    pub fn listing(&self) -> &str {
        match self {
            Self::InvalidListingUrl { listing, .. } | Self::Fetch { listing, .. } => listing,
        }
    }
}
