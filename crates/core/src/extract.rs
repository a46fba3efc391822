//! Per-page content extraction.
//!
//! Selects the article fragment(s) of one fetched page and runs the site's
//! cleanup rules over each of them. Selection uses `scraper`; the rules are
//! streaming rewrites with `lol_html`, the same way the rest of the crate
//! rewrites markup.

use url::Url;

use crate::parse::Document;
use crate::{Result, UnpageError};

/// The fragments one page contributes, in document order.
pub type FragmentSet = Vec<String>;

/// Runs a set of `lol_html` element handlers over `$html` and evaluates to
/// the rewritten markup. Uses `?`, so it only works inside functions
/// returning [`Result<String>`].
macro_rules! rewrite_html {
    ($html:expr, $($handler:expr),+ $(,)?) => {{
        let mut output = String::new();
        let mut rewriter = lol_html::HtmlRewriter::new(
            lol_html::Settings { element_content_handlers: vec![$($handler),+], ..Default::default() },
            |c: &[u8]| {
                output.push_str(&String::from_utf8_lossy(c));
            },
        );

        rewriter
            .write($html.as_bytes())
            .map_err(|e| $crate::UnpageError::HtmlParseError(e.to_string()))?;
        rewriter
            .end()
            .map_err(|e| $crate::UnpageError::HtmlParseError(e.to_string()))?;

        Ok::<String, $crate::UnpageError>(output)
    }};
}

pub(crate) use rewrite_html;

/// Checks that `selector` is something `lol_html` can match on.
///
/// `lol_html::element!` unwraps the selector parse, so every selector goes
/// through here before reaching it.
pub(crate) fn check_rewrite_selector(selector: &str) -> Result<()> {
    selector
        .parse::<lol_html::Selector>()
        .map(|_| ())
        .map_err(|e| UnpageError::InvalidSelector { selector: selector.to_string(), reason: e.to_string() })
}

/// Where a fragment came from.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// 1-based page number.
    pub page: u32,
    /// URL the page was fetched from, when known.
    pub url: Option<&'a Url>,
}

/// A cleanup transform applied to every fragment before it is accumulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionRule {
    /// Remove matching sub-elements (share bars, footers, pagination).
    Remove(String),
    /// Keep matching sub-elements but hide them with `display:none`.
    Hide(String),
    /// Remove matching sub-elements on every page except the first, for
    /// titles and headers that each page repeats.
    RemoveOnLaterPages(String),
    /// Copy a deferred image source (e.g. `data-src`) into `src`.
    ResolveLazyImages { attr: String },
    /// Resolve relative `href`/`src` attributes against the page URL.
    AbsoluteUrls,
}

impl ExtractionRule {
    /// Validates the selector this rule rewrites with.
    pub fn validate(&self) -> Result<()> {
        match self {
            ExtractionRule::Remove(sel) | ExtractionRule::Hide(sel) | ExtractionRule::RemoveOnLaterPages(sel) => {
                check_rewrite_selector(sel)
            }
            ExtractionRule::ResolveLazyImages { attr } => check_rewrite_selector(&lazy_image_selector(attr)),
            ExtractionRule::AbsoluteUrls => Ok(()),
        }
    }

    /// Applies the rule to one fragment.
    pub fn apply(&self, html: &str, ctx: &PageContext<'_>) -> Result<String> {
        match self {
            ExtractionRule::Remove(sel) => remove_matching(html, sel),
            ExtractionRule::RemoveOnLaterPages(sel) if ctx.page > 1 => remove_matching(html, sel),
            ExtractionRule::RemoveOnLaterPages(_) => Ok(html.to_string()),
            ExtractionRule::Hide(sel) => hide_matching(html, sel),
            ExtractionRule::ResolveLazyImages { attr } => resolve_lazy_images(html, attr),
            ExtractionRule::AbsoluteUrls => match ctx.url {
                Some(base) => absolutize_urls(html, base),
                None => Ok(html.to_string()),
            },
        }
    }
}

/// Selects `content_selector` in `doc` and applies `rules` to each match.
///
/// Zero matches is an empty contribution, not an error.
pub fn extract_fragments(
    doc: &Document, content_selector: &str, rules: &[ExtractionRule], ctx: &PageContext<'_>,
) -> Result<FragmentSet> {
    let mut fragments = Vec::new();

    for element in doc.select(content_selector)? {
        let mut html = element.outer_html();
        for rule in rules {
            html = rule.apply(&html, ctx)?;
        }
        fragments.push(html);
    }

    tracing::trace!(page = ctx.page, fragments = fragments.len(), "extracted fragments");

    Ok(fragments)
}

fn lazy_image_selector(attr: &str) -> String {
    format!("img[{}]", attr)
}

fn remove_matching(html: &str, selector: &str) -> Result<String> {
    check_rewrite_selector(selector)?;
    rewrite_html!(
        html,
        lol_html::element!(selector, |el| {
            el.remove();
            Ok(())
        })
    )
}

fn hide_matching(html: &str, selector: &str) -> Result<String> {
    check_rewrite_selector(selector)?;
    rewrite_html!(
        html,
        lol_html::element!(selector, |el| {
            let style = match el.get_attribute("style") {
                Some(existing) if !existing.trim().is_empty() => {
                    format!("{};display:none", existing.trim().trim_end_matches(';'))
                }
                _ => "display:none".to_string(),
            };
            el.set_attribute("style", &style)?;
            Ok(())
        })
    )
}

fn resolve_lazy_images(html: &str, attr: &str) -> Result<String> {
    let selector = lazy_image_selector(attr);
    check_rewrite_selector(&selector)?;
    rewrite_html!(
        html,
        lol_html::element!(selector.as_str(), |el| {
            if let Some(deferred) = el.get_attribute(attr)
                && !deferred.trim().is_empty()
            {
                el.set_attribute("src", deferred.trim())?;
            }
            Ok(())
        })
    )
}

fn absolutize_urls(html: &str, base_url: &Url) -> Result<String> {
    rewrite_html!(
        html,
        lol_html::element!("a[href]", |el| {
            if let Some(href) = el.get_attribute("href")
                && !href.starts_with('#')
                && let Ok(absolute) = base_url.join(&href)
            {
                el.set_attribute("href", absolute.as_str())?;
            }
            Ok(())
        }),
        lol_html::element!("img[src]", |el| {
            if let Some(src) = el.get_attribute("src")
                && let Ok(absolute) = base_url.join(&src)
            {
                el.set_attribute("src", absolute.as_str())?;
            }
            Ok(())
        }),
    )
}
