//! Error types for unpage operations.
//!
//! This module defines the main error type [`UnpageError`] which represents
//! every failure a pagination session can run into: URL rewriting, fetching,
//! extraction, termination checks and the final DOM replacement.
//!
//! # Example
//!
//! ```rust
//! use unpage_core::{UnpageError, Result};
//!
//! fn first_segment(url: &str) -> Result<&str> {
//!     url.split('/').nth(1).ok_or_else(|| UnpageError::NotAnArticleUrl(url.to_string()))
//! }
//! # assert!(first_segment("nope").is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pagination sessions.
///
/// Every variant is caught at the session boundary by
/// [`Paginator::run_session`](crate::session::Paginator::run_session) and
/// turned into a failed [`SessionOutcome`](crate::session::SessionOutcome);
/// the lower-level APIs return them directly.
#[derive(Error, Debug)]
pub enum UnpageError {
    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, connection issues,
    /// and other transport problems.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// The page kept answering with an empty body.
    ///
    /// Returned once the fetcher has used up its empty-body retries.
    #[error("Empty response body from {url}")]
    EmptyResponse { url: String },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL does not have the path shape the site's descriptor expects.
    #[error("Not an article URL: {0}")]
    NotAnArticleUrl(String),

    /// A URL template without exactly one page placeholder.
    #[error("Invalid URL template: {0}")]
    InvalidTemplate(String),

    /// A CSS selector in a descriptor could not be parsed.
    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// HTML parsing or rewriting errors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The first page already signalled that the article had ended.
    #[error("No content could be extracted from the article")]
    NoContent,

    /// The termination predicate never fired within the page cap.
    #[error("Gave up after {limit} pages without reaching the last page")]
    PageLimitExceeded { limit: u32 },

    /// The whole session ran longer than allowed.
    #[error("Session timed out after {timeout} seconds")]
    SessionTimeout { timeout: u64 },

    /// The session was cancelled by its caller.
    #[error("Session cancelled")]
    Cancelled,

    /// Another session is already running on this paginator.
    #[error("Another session is already in progress")]
    SessionBusy,

    /// No listener answered on the target page.
    #[error("Target page is not ready")]
    TargetNotReady,

    /// The replacement target could not be located or replaced.
    #[error("Replacement failed: {0}")]
    ReplacementFailed(String),

    /// No descriptor is registered for the URL's host.
    #[error("Site not supported: {0}")]
    UnsupportedSite(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read/write errors.
    #[error("I/O error: {0}")]
    WriteError(#[from] std::io::Error),

    /// Descriptor directory or loader errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A descriptor file could not be parsed.
    #[error("Site configuration error: {0}")]
    SiteConfigError(String),
}

impl UnpageError {
    /// Short message suitable for the status line of a UI.
    ///
    /// Only URL-shape problems and an unresponsive target page get their own
    /// wording; everything else collapses into a generic failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            UnpageError::NotAnArticleUrl(_) | UnpageError::InvalidUrl(_) => "Invalid URL format :(",
            UnpageError::TargetNotReady => "Page isn't ready - try again in a few seconds",
            UnpageError::UnsupportedSite(_) => "Sorry, this site is not yet supported.",
            UnpageError::SessionBusy => "Already loading this article.",
            UnpageError::Cancelled => "Cancelled.",
            _ => "Something went wrong.",
        }
    }
}

/// Result type alias for UnpageError.
pub type Result<T> = std::result::Result<T, UnpageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UnpageError::NotAnArticleUrl("http://example.com/x".to_string());
        assert!(err.to_string().contains("Not an article URL"));
    }

    #[test]
    fn test_page_limit_error() {
        let err = UnpageError::PageLimitExceeded { limit: 50 };
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            UnpageError::NotAnArticleUrl(String::new()).user_message(),
            "Invalid URL format :("
        );
        assert!(UnpageError::TargetNotReady.user_message().contains("try again"));
        assert_eq!(UnpageError::NoContent.user_message(), "Something went wrong.");
    }
}
