//! Live-page replacement.
//!
//! The engine never touches a page directly; it asks a [`PageTransport`] to
//! do it. A transport answers `None` when nobody is listening on the page
//! (not loaded yet, or the content script never got injected), which the
//! applier reports as [`UnpageError::TargetNotReady`] so the caller can
//! suggest a retry.
//!
//! [`StaticDocument`] is the bundled transport: the "live page" is an HTML
//! string held in memory, rewritten with `lol_html`.

use std::cell::Cell;

use async_trait::async_trait;
use lol_html::html_content::ContentType;
use scraper::ElementRef;
use serde::Serialize;

use crate::extract::{check_rewrite_selector, rewrite_html};
use crate::parse::{Document, parse_selector};
use crate::sites::{ReplaceMode, ReplacementTarget};
use crate::{Result, UnpageError};

/// Answer to a transport request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransportResponse {
    pub success: bool,
    pub num_affected: Option<usize>,
    pub error: Option<String>,
}

impl TransportResponse {
    pub fn ok(num_affected: usize) -> Self {
        Self { success: true, num_affected: Some(num_affected), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, num_affected: None, error: Some(error.into()) }
    }
}

/// DOM operations against the live page.
#[async_trait]
pub trait PageTransport: Send {
    /// Replaces the element(s) matching `selector` with `markup`.
    async fn replace(&mut self, selector: &str, markup: &str, mode: ReplaceMode) -> Option<TransportResponse>;

    /// Adds `class` to every element matching `selector`.
    async fn add_class(&mut self, selector: &str, class: &str) -> Option<TransportResponse>;

    /// Fires a named event on the first element matching `selector`.
    async fn trigger(&mut self, selector: &str, event: &str) -> Option<TransportResponse>;
}

/// Swaps the assembled article into the live page.
///
/// Returns how many elements were replaced.
pub async fn apply_replacement(
    transport: &mut dyn PageTransport, target: &ReplacementTarget, markup: &str,
) -> Result<usize> {
    let response = transport
        .replace(&target.selector, markup, target.mode)
        .await
        .ok_or(UnpageError::TargetNotReady)?;

    if !response.success {
        let reason = response
            .error
            .unwrap_or_else(|| "transport reported failure".to_string());
        return Err(UnpageError::ReplacementFailed(reason));
    }

    match response.num_affected {
        Some(0) => Err(UnpageError::ReplacementFailed(format!(
            "no element matches {}",
            target.selector
        ))),
        Some(n) => Ok(n),
        None => Ok(1),
    }
}

/// An in-memory page that acts as its own transport.
#[derive(Debug, Clone, Default)]
pub struct StaticDocument {
    html: String,
    events: Vec<(String, String)>,
}

impl StaticDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into(), events: Vec::new() }
    }

    /// Current markup of the page.
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// `(selector, event)` pairs fired with [`PageTransport::trigger`].
    pub fn triggered_events(&self) -> &[(String, String)] {
        &self.events
    }

    fn replace_sync(&mut self, selector: &str, markup: &str, mode: ReplaceMode) -> Result<usize> {
        check_rewrite_selector(selector)?;
        let replaced = Cell::new(0usize);

        let html = rewrite_html!(
            self.html,
            lol_html::element!(selector, |el| {
                if mode == ReplaceMode::Single && replaced.get() > 0 {
                    return Ok(());
                }
                el.replace(markup, ContentType::Html);
                replaced.set(replaced.get() + 1);
                Ok(())
            })
        )?;

        // A match nested in another match vanishes with its parent, but
        // lol_html still runs the handler on it.
        let replaced = match replaced.get() {
            n if mode == ReplaceMode::All && n > 1 => outermost_matches(&self.html, selector)?,
            n => n,
        };

        if replaced > 0 {
            self.html = html;
        }
        Ok(replaced)
    }

    fn add_class_sync(&mut self, selector: &str, class: &str) -> Result<usize> {
        check_rewrite_selector(selector)?;
        let matched = Cell::new(0usize);

        let html = rewrite_html!(
            self.html,
            lol_html::element!(selector, |el| {
                matched.set(matched.get() + 1);
                let classes = match el.get_attribute("class") {
                    Some(existing) if existing.split_whitespace().any(|c| c == class) => return Ok(()),
                    Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
                    _ => class.to_string(),
                };
                el.set_attribute("class", &classes)?;
                Ok(())
            })
        )?;

        self.html = html;
        Ok(matched.get())
    }
}

/// Counts matches of `selector` that have no matching ancestor.
fn outermost_matches(html: &str, selector: &str) -> Result<usize> {
    let selector = parse_selector(selector)?;
    let doc = Document::parse(html);

    Ok(doc
        .html()
        .select(&selector)
        .filter(|el| !el.ancestors().filter_map(ElementRef::wrap).any(|parent| selector.matches(&parent)))
        .count())
}

#[async_trait]
impl PageTransport for StaticDocument {
    async fn replace(&mut self, selector: &str, markup: &str, mode: ReplaceMode) -> Option<TransportResponse> {
        Some(match self.replace_sync(selector, markup, mode) {
            Ok(0) => TransportResponse::failed(format!("no element matches {}", selector)),
            Ok(n) => TransportResponse::ok(n),
            Err(e) => TransportResponse::failed(e.to_string()),
        })
    }

    async fn add_class(&mut self, selector: &str, class: &str) -> Option<TransportResponse> {
        Some(match self.add_class_sync(selector, class) {
            Ok(n) => TransportResponse::ok(n),
            Err(e) => TransportResponse::failed(e.to_string()),
        })
    }

    async fn trigger(&mut self, selector: &str, event: &str) -> Option<TransportResponse> {
        let matched = match Document::parse(&self.html).select_first(selector) {
            Ok(found) => found.is_some(),
            Err(e) => return Some(TransportResponse::failed(e.to_string())),
        };

        if !matched {
            return Some(TransportResponse::ok(0));
        }
        self.events.push((selector.to_string(), event.to_string()));
        Some(TransportResponse::ok(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIVE: &str = r#"<html><body><div class="article-body">page 1 only</div><div class="article-body">dup</div><footer>f</footer></body></html>"#;
    const ASSEMBLED: &str = r#"<div id="newArticleBody" class="article-body">all pages</div>"#;

    struct NoListener;

    #[async_trait]
    impl PageTransport for NoListener {
        async fn replace(&mut self, _: &str, _: &str, _: ReplaceMode) -> Option<TransportResponse> {
            None
        }

        async fn add_class(&mut self, _: &str, _: &str) -> Option<TransportResponse> {
            None
        }

        async fn trigger(&mut self, _: &str, _: &str) -> Option<TransportResponse> {
            None
        }
    }

    #[tokio::test]
    async fn test_replace_first_match() {
        let mut doc = StaticDocument::new(LIVE);
        let n = apply_replacement(&mut doc, &ReplacementTarget::single(".article-body"), ASSEMBLED)
            .await
            .unwrap();

        assert_eq!(n, 1);
        assert!(doc.html().contains("all pages"));
        assert!(!doc.html().contains("page 1 only"));
        assert!(doc.html().contains("dup"));
    }

    #[tokio::test]
    async fn test_replace_all_matches() {
        let mut doc = StaticDocument::new(LIVE);
        let target = ReplacementTarget { selector: ".article-body".to_string(), mode: ReplaceMode::All };
        let n = apply_replacement(&mut doc, &target, ASSEMBLED).await.unwrap();

        assert_eq!(n, 2);
        assert_eq!(doc.html().matches("all pages").count(), 2);
        assert!(!doc.html().contains("dup"));
    }

    #[tokio::test]
    async fn test_replace_all_counts_nested_match_once() {
        let mut doc = StaticDocument::new(r#"<body><div class="a"><div class="a">inner</div></div><p>tail</p></body>"#);
        let response = doc.replace(".a", "<p>X</p>", ReplaceMode::All).await.unwrap();

        assert_eq!(response, TransportResponse::ok(1));
        assert_eq!(doc.html().matches("<p>X</p>").count(), 1);
        assert!(!doc.html().contains("inner"));
        assert!(doc.html().contains("tail"));
    }

    #[tokio::test]
    async fn test_missing_target_leaves_page_alone() {
        let mut doc = StaticDocument::new(LIVE);
        let result = apply_replacement(&mut doc, &ReplacementTarget::single("#nope"), ASSEMBLED).await;

        assert!(matches!(result, Err(UnpageError::ReplacementFailed(_))));
        assert_eq!(doc.html(), LIVE);
    }

    #[tokio::test]
    async fn test_no_listener_is_not_ready() {
        let mut transport = NoListener;
        let result = apply_replacement(&mut transport, &ReplacementTarget::single("div"), ASSEMBLED).await;
        assert!(matches!(result, Err(UnpageError::TargetNotReady)));
    }

    #[tokio::test]
    async fn test_add_class_and_trigger() {
        let mut doc = StaticDocument::new(LIVE);

        let response = doc.add_class(".article-body", "unpaged").await.unwrap();
        assert_eq!(response, TransportResponse::ok(2));
        assert_eq!(doc.html().matches(r#"class="article-body unpaged""#).count(), 2);

        let again = doc.add_class(".article-body", "unpaged").await.unwrap();
        assert_eq!(again.num_affected, Some(2));
        assert!(!doc.html().contains("unpaged unpaged"));

        let fired = doc.trigger("footer", "scroll").await.unwrap();
        assert_eq!(fired, TransportResponse::ok(1));
        let missed = doc.trigger("#nope", "scroll").await.unwrap();
        assert_eq!(missed.num_affected, Some(0));
        assert_eq!(doc.triggered_events(), &[("footer".to_string(), "scroll".to_string())]);
    }

    #[tokio::test]
    async fn test_invalid_selector_is_reported() {
        let mut doc = StaticDocument::new(LIVE);
        let response = doc.replace("div[[", ASSEMBLED, ReplaceMode::Single).await.unwrap();
        assert!(!response.success);
        assert!(response.error.is_some());
    }
}
