//! HTTP fetch capability used by discovery and the download engine.
//!
//! [`Fetcher`] is the seam between the pipeline and the network: listing
//! pages come back as text, archives come back as a byte stream the engine
//! writes itself. [`HttpClient`] is the reqwest-backed implementation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Streamed response body for one archive.
pub struct ResourceStream {
    /// Size announced by the server, when it sent one.
    pub content_length: Option<u64>,
    /// Body chunks in arrival order.
    pub chunks: BoxStream<'static, Result<Bytes, DownloadError>>,
}

impl fmt::Debug for ResourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Fetch capability: GET a URL as text or as a byte stream.
///
/// Implementations must apply a timeout to every request so a hung
/// connection cannot stall the worker pool.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a listing page body.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] on network failure or non-success status.
    async fn fetch_text(&self, url: &Url) -> Result<String, DownloadError>;

    /// Opens a streamed GET for an archive.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] on network failure or non-success status.
    async fn open(&self, url: &Url) -> Result<ResourceStream, DownloadError>;
}

/// HTTP client for listing pages and archive downloads.
///
/// Created once per run and shared by every worker, so connections are
/// pooled. Proxy settings come from the standard environment variables
/// through reqwest's defaults.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 2 minutes between body reads
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot initialize.
    #[instrument(level = "debug")]
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    async fn send_get(&self, url: &Url) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch_text(&self, url: &Url) -> Result<String, DownloadError> {
        let response = self.send_get(url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;
        debug!(bytes = body.len(), "fetched listing page");
        Ok(body)
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn open(&self, url: &Url) -> Result<ResourceStream, DownloadError> {
        let response = self.send_get(url).await?;
        let content_length = content_length(&response);
        debug!(?content_length, "opened archive stream");

        let owned_url = url.to_string();
        let chunks = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| DownloadError::network(owned_url.as_str(), e)))
            .boxed();

        Ok(ResourceStream {
            content_length,
            chunks,
        })
    }
}

/// Declared body length. Ignored for compressed bodies, whose header counts
/// encoded bytes rather than what lands on disk.
fn content_length(response: &reqwest::Response) -> Option<u64> {
    if response
        .headers()
        .contains_key(reqwest::header::CONTENT_ENCODING)
    {
        return None;
    }
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_default_timeouts() {
        assert!(HttpClient::new().is_ok());
    }

    #[test]
    fn test_client_builds_with_custom_timeouts() {
        assert!(HttpClient::new_with_timeouts(1, 1).is_ok());
    }

    #[test]
    fn test_resource_stream_debug_hides_body() {
        let stream = ResourceStream {
            content_length: Some(3),
            chunks: futures_util::stream::empty().boxed(),
        };
        let rendered = format!("{stream:?}");
        assert!(rendered.contains("content_length"));
        assert!(rendered.contains("Some(3)"));
    }
}
