//! Run configuration shared by every pipeline stage.
//!
//! [`CrawlConfig`] is built once (defaults, then the config file, then CLI
//! flags), validated, and handed to the orchestrator by value. Nothing in the
//! pipeline mutates it.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::download::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY, READ_TIMEOUT_SECS,
};
use crate::ledger::state_file_name;

/// Release crawled when none is configured.
pub const DEFAULT_RELEASE: &str = "18";

/// Archive suffix matched when none is configured.
pub const DEFAULT_SUFFIX: &str = ".zip";

/// Upper bound for either HTTP timeout.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Series directories published for every release.
pub const DEFAULT_LISTINGS: [&str; 28] = [
    "21_series/",
    "22_series/",
    "23_series/",
    "24_series/",
    "25_series/",
    "26_series/",
    "27_series/",
    "28_series/",
    "29_series/",
    "31_series/",
    "32_series/",
    "33_series/",
    "34_series/",
    "35_series/",
    "36_series/",
    "37_series/",
    "38_series/",
    "41_series/",
    "42_series/",
    "43_series/",
    "44_series/",
    "45_series/",
    "46_series/",
    "48_series/",
    "49_series/",
    "51_series/",
    "52_series/",
    "55_series/",
];

/// Default listing root for `release`.
#[must_use]
pub fn default_base_url(release: &str) -> String {
    format!("https://www.3gpp.org/ftp/Specs/latest/Rel-{release}/")
}

/// Default download directory for `release`.
#[must_use]
pub fn default_download_root(release: &str) -> PathBuf {
    PathBuf::from("data").join(format!("Rel-{release}"))
}

/// Invalid configuration. Always fatal, raised before any work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Release identifier is empty or unusable in a file name.
    #[error("invalid release '{0}': use letters, digits, '.', '-' or '_'")]
    InvalidRelease(String),

    /// Base URL does not parse or is not http(s).
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// URL as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No listing identifiers to scan.
    #[error("no listings configured")]
    NoListings,

    /// Suffix filter is empty.
    #[error("suffix must not be empty")]
    EmptySuffix,

    /// Worker count outside the supported range.
    #[error("invalid concurrency {0}: expected {MIN_CONCURRENCY}..={MAX_CONCURRENCY}")]
    InvalidConcurrency(usize),

    /// Timeout outside the supported range.
    #[error("invalid {field} {value}: expected 1..={MAX_TIMEOUT_SECS} seconds")]
    InvalidTimeout {
        /// Which timeout.
        field: &'static str,
        /// Value given.
        value: u64,
    },
}

/// Immutable settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Release identifier; names the state file.
    pub release: String,
    /// Root that listing identifiers are joined onto. Always ends with `/`.
    pub base_url: Url,
    /// Listing identifiers, scanned in order.
    pub listings: Vec<String>,
    /// Case-sensitive path suffix a link must end with.
    pub suffix: String,
    /// Directory archives are written under.
    pub download_root: PathBuf,
    /// Directory holding the state file.
    pub state_dir: PathBuf,
    /// Number of download workers.
    pub concurrency: usize,
    /// HTTP connect timeout.
    pub connect_timeout_secs: u64,
    /// HTTP read-idle timeout.
    pub read_timeout_secs: u64,
    /// Keep the state file after a clean run instead of removing it.
    pub keep_state: bool,
}

impl CrawlConfig {
    /// Builds the default configuration for `release`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRelease`] if the release cannot name a
    /// state file.
    pub fn for_release(release: &str) -> Result<Self, ConfigError> {
        validate_release(release)?;
        Ok(Self {
            release: release.to_string(),
            base_url: parse_base_url(&default_base_url(release))?,
            listings: DEFAULT_LISTINGS.iter().map(|l| (*l).to_string()).collect(),
            suffix: DEFAULT_SUFFIX.to_string(),
            download_root: default_download_root(release),
            state_dir: PathBuf::from("."),
            concurrency: DEFAULT_CONCURRENCY,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
            keep_state: false,
        })
    }

    /// Checks every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_release(&self.release)?;
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }
        if self.listings.is_empty() {
            return Err(ConfigError::NoListings);
        }
        if self.suffix.is_empty() {
            return Err(ConfigError::EmptySuffix);
        }
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        validate_timeout("connect timeout", self.connect_timeout_secs)?;
        validate_timeout("read timeout", self.read_timeout_secs)?;
        Ok(())
    }

    /// Path of this release's state file.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join(state_file_name(&self.release))
    }
}

/// Parses a listing root, appending the trailing `/` URL joins rely on.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] if the URL does not parse, is not
/// http(s), or cannot hold a path.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn validate_release(release: &str) -> Result<(), ConfigError> {
    let usable = !release.is_empty()
        && release
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if usable {
        Ok(())
    } else {
        Err(ConfigError::InvalidRelease(release.to_string()))
    }
}

fn validate_timeout(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if (1..=MAX_TIMEOUT_SECS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTimeout { field, value })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_for_release_applies_defaults() {
        let config = CrawlConfig::for_release("18").unwrap();
        assert_eq!(
            config.base_url.as_str(),
            "https://www.3gpp.org/ftp/Specs/latest/Rel-18/"
        );
        assert_eq!(config.listings.len(), 28);
        assert_eq!(config.listings[0], "21_series/");
        assert_eq!(config.listings[27], "55_series/");
        assert_eq!(config.suffix, ".zip");
        assert_eq!(config.download_root, PathBuf::from("data/Rel-18"));
        assert_eq!(config.concurrency, 7);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.read_timeout_secs, 120);
        assert!(!config.keep_state);
        config.validate().unwrap();
    }

    #[test]
    fn test_state_file_is_named_after_release() {
        let mut config = CrawlConfig::for_release("17").unwrap();
        config.state_dir = PathBuf::from("/var/lib/specfetch");
        assert_eq!(
            config.state_file(),
            PathBuf::from("/var/lib/specfetch/download_state_rel-17.json")
        );
    }

    #[test]
    fn test_release_rejects_path_characters() {
        assert!(matches!(
            CrawlConfig::for_release("../18"),
            Err(ConfigError::InvalidRelease(_))
        ));
        assert!(matches!(
            CrawlConfig::for_release(""),
            Err(ConfigError::InvalidRelease(_))
        ));
    }

    #[test]
    fn test_parse_base_url_appends_trailing_slash() {
        let url = parse_base_url("https://example.com/Rel-18").unwrap();
        assert_eq!(url.as_str(), "https://example.com/Rel-18/");
        assert_eq!(url.join("21_series/").unwrap().path(), "/Rel-18/21_series/");
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(matches!(
            parse_base_url("ftp://example.com/"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let base = CrawlConfig::for_release("18").unwrap();

        let mut config = base.clone();
        config.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency(0))
        ));

        let mut config = base.clone();
        config.concurrency = 101;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.read_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout {
                field: "read timeout",
                ..
            })
        ));

        let mut config = base.clone();
        config.listings.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoListings)));

        let mut config = base;
        config.suffix.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptySuffix)));
    }
}
