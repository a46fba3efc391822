//! Page fetching.
//!
//! The driver fetches through the [`PageFetcher`] trait so tests and
//! embedders can feed pages from anywhere. [`HttpFetcher`] is the reqwest
//! implementation; [`fetch_file`] and [`fetch_stdin`] read a live page that
//! was saved locally.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "fetch")]
use reqwest::Client;
#[cfg(feature = "fetch")]
use url::Url;

use crate::{Result, UnpageError};

/// Source of raw page HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page and returns its body text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// HTTP client configuration for fetching pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// How many more times to request a page that came back empty.
    pub empty_body_retries: u32,
    /// Pause between empty-body retries.
    pub empty_body_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; Unpage/0.1)".to_string(),
            empty_body_retries: 2,
            empty_body_backoff: Duration::from_millis(500),
        }
    }
}

/// reqwest-backed [`PageFetcher`].
///
/// Non-success statuses are errors. An empty body is treated as "not ready
/// yet": the page is requested again up to
/// [`FetchConfig::empty_body_retries`] times before giving up with
/// [`UnpageError::EmptyResponse`].
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

#[cfg(feature = "fetch")]
impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(UnpageError::HttpError)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn get_once(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", &self.config.user_agent)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UnpageError::HttpStatus { status: status.as_u16(), url: url.to_string() });
        }

        response.text().await.map_err(|e| self.map_send_error(e))
    }

    fn map_send_error(&self, e: reqwest::Error) -> UnpageError {
        if e.is_timeout() { UnpageError::Timeout { timeout: self.config.timeout } } else { UnpageError::HttpError(e) }
    }
}

#[cfg(feature = "fetch")]
#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed_url = Url::parse(url).map_err(|e| UnpageError::InvalidUrl(e.to_string()))?;

        if !matches!(parsed_url.scheme(), "http" | "https") {
            return Err(UnpageError::InvalidUrl(
                "URL must use http:// or https://".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            tracing::debug!(url = %parsed_url, attempt, "requesting page");
            let body = self.get_once(&parsed_url).await?;

            if !body.trim().is_empty() {
                tracing::debug!(url = %parsed_url, bytes = body.len(), "got page");
                return Ok(body);
            }

            if attempt >= self.config.empty_body_retries {
                tracing::warn!(url = %parsed_url, attempts = attempt + 1, "page body stayed empty");
                return Err(UnpageError::EmptyResponse { url: url.to_string() });
            }

            attempt += 1;
            tokio::time::sleep(self.config.empty_body_backoff).await;
        }
    }
}

/// Fetches a single URL with a one-off [`HttpFetcher`].
#[cfg(feature = "fetch")]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    HttpFetcher::new(config.clone())?.fetch(url).await
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(UnpageError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(UnpageError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(UnpageError::from)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert_eq!(config.empty_body_retries, 2);
        assert!(config.user_agent.contains("Unpage"));
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn test_fetch_url_invalid() {
        let result = fetch_url("not-a-url", &FetchConfig::default()).await;
        assert!(matches!(result, Err(UnpageError::InvalidUrl(_))));

        let result = fetch_url("file:///etc/hosts", &FetchConfig::default()).await;
        assert!(matches!(result, Err(UnpageError::InvalidUrl(_))));
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.html");
        assert!(matches!(result, Err(UnpageError::FileNotFound(_))));
    }

    #[test]
    fn test_fetch_file_reads_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html><body>live</body></html>").unwrap();

        let html = fetch_file(path.to_str().unwrap()).unwrap();
        assert!(html.contains("live"));
    }
}
