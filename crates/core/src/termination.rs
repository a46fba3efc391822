//! Loop termination predicates.
//!
//! Two checks decide when a session stops:
//!
//! - [`PastEnd`] runs on a freshly fetched page *before* extraction. When it
//!   fires the page is junk (it belongs to a different article, or carries
//!   no content) and contributes nothing; the previous page was the last.
//! - [`LastPage`] runs *after* extraction and says whether the page that was
//!   just accumulated is the final one.

use regex::Regex;
use url::Url;

use crate::parse::Document;
use crate::{Result, UnpageError};

/// Base used to resolve relative hrefs when only their query matters.
const RELATIVE_BASE: &str = "http://localhost/";

/// Decides whether a page that was just accumulated is the article's last.
#[derive(Debug, Clone)]
pub enum LastPage {
    /// Never the last page; the session relies on [`PastEnd`] alone.
    Never,
    /// Always the last page (single-page descriptors).
    Always,
    /// Inspect the page's "next" control.
    NextLink(NextLinkRule),
}

impl LastPage {
    pub fn is_last_page(&self, doc: &Document) -> Result<bool> {
        match self {
            LastPage::Never => Ok(false),
            LastPage::Always => Ok(true),
            LastPage::NextLink(rule) => rule.is_last_page(doc),
        }
    }
}

/// "Next" control inspection.
///
/// The page is the last one when the control is missing, or when it points
/// at something that is not another page of this article.
#[derive(Debug, Clone)]
pub struct NextLinkRule {
    selector: String,
    end_hrefs: Vec<String>,
    required_query_key: Option<String>,
    next_article_text: Option<Regex>,
}

impl NextLinkRule {
    pub fn new(selector: impl Into<String>) -> Self {
        Self { selector: selector.into(), end_hrefs: Vec::new(), required_query_key: None, next_article_text: None }
    }

    /// Treat a next control pointing at `href` as the end (e.g. an
    /// end-of-gallery placeholder).
    pub fn end_href(mut self, href: impl Into<String>) -> Self {
        self.end_hrefs.push(href.into());
        self
    }

    /// Treat a next control whose target lacks this query key as the end.
    pub fn required_query_key(mut self, key: impl Into<String>) -> Self {
        self.required_query_key = Some(key.into());
        self
    }

    /// Treat a next control whose text matches `pattern` as the end.
    pub fn next_article_text(mut self, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|e| UnpageError::ConfigError(format!("bad pattern {}: {}", pattern, e)))?;
        self.next_article_text = Some(re);
        Ok(self)
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn is_last_page(&self, doc: &Document) -> Result<bool> {
        let Some(link) = doc.select_first(&self.selector)? else {
            return Ok(true);
        };

        let href = link.attr("href").unwrap_or("").trim();

        if self.end_hrefs.iter().any(|end| href_matches(href, end)) {
            return Ok(true);
        }

        if let Some(key) = &self.required_query_key
            && !href_has_query_key(href, key)
        {
            return Ok(true);
        }

        if let Some(pattern) = &self.next_article_text
            && pattern.is_match(link.text().trim())
        {
            return Ok(true);
        }

        Ok(false)
    }
}

/// Detects a fetched page that is already past the end of the article.
#[derive(Debug, Clone)]
pub enum PastEnd {
    /// An element matching `selector` is present, and its text matches
    /// `text` when given.
    Matches { selector: String, text: Option<Regex> },
    /// The content selector matches nothing.
    MissingContent,
}

impl PastEnd {
    pub fn matches(selector: impl Into<String>) -> Self {
        PastEnd::Matches { selector: selector.into(), text: None }
    }

    pub fn matches_text(selector: impl Into<String>, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|e| UnpageError::ConfigError(format!("bad pattern {}: {}", pattern, e)))?;
        Ok(PastEnd::Matches { selector: selector.into(), text: Some(re) })
    }

    pub fn is_past_end(&self, doc: &Document, content_selector: &str) -> Result<bool> {
        match self {
            PastEnd::Matches { selector, text: None } => Ok(doc.select_first(selector)?.is_some()),
            PastEnd::Matches { selector, text: Some(pattern) } => Ok(doc
                .select(selector)?
                .iter()
                .any(|el| pattern.is_match(el.text().trim()))),
            PastEnd::MissingContent => Ok(doc.select_first(content_selector)?.is_none()),
        }
    }
}

/// Exact match, or an absolute href whose path is the marker.
fn href_matches(href: &str, marker: &str) -> bool {
    if href == marker {
        return true;
    }
    match Url::parse(href) {
        Ok(url) => url.path() == marker,
        Err(_) => false,
    }
}

fn href_has_query_key(href: &str, key: &str) -> bool {
    let Ok(base) = Url::parse(RELATIVE_BASE) else {
        return false;
    };
    match base.join(href) {
        Ok(url) => url.query_pairs().any(|(k, _)| k == key),
        Err(_) => false,
    }
}
