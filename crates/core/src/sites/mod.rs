//! Site descriptors.
//!
//! Every supported site is described by a [`SiteDescriptor`]: how its
//! article URLs paginate, where the article content lives, how to clean each
//! page up, when to stop, and what to replace on the live page. The driver
//! only talks to the [`SiteAdapter`] trait, so a site that needs logic a
//! descriptor can't express can implement the trait directly.

pub mod knowable;
pub mod registry;

pub use registry::{SiteRegistry, host_key};

use crate::extract::{ExtractionRule, FragmentSet, PageContext, check_rewrite_selector, extract_fragments};
use crate::parse::{Document, parse_selector};
use crate::rewrite::UrlRule;
use crate::template::UrlTemplate;
use crate::termination::{LastPage, PastEnd};
use crate::{Result, UnpageError};

/// The capabilities the pagination driver needs from a site.
pub trait SiteAdapter: Send + Sync {
    /// Registered host key, e.g. `knowable.com`.
    fn id(&self) -> &str;

    /// Maps an article URL to the template of all its pages.
    fn compute_template(&self, url: &str) -> Result<UrlTemplate>;

    /// Selector of the article content within a fetched page.
    fn content_selector(&self) -> &str;

    /// Checked before extraction; `true` means the page belongs past the end
    /// of the article and is discarded.
    fn is_past_last_page(&self, _doc: &Document) -> Result<bool> {
        Ok(false)
    }

    /// Extracts and cleans the page's fragments.
    fn extract(&self, doc: &Document, ctx: &PageContext<'_>) -> Result<FragmentSet>;

    /// Checked after extraction; `true` ends the session with this page.
    fn is_last_page(&self, doc: &Document, fragments: &FragmentSet) -> Result<bool>;

    /// What to replace on the live page.
    fn replacement_target(&self) -> &ReplacementTarget;

    /// Class put on the assembled container so site styles still apply.
    fn container_class(&self) -> Option<&str> {
        None
    }
}

/// How many live-page matches to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceMode {
    /// Replace the first match only.
    #[default]
    Single,
    /// Replace every match with the same content.
    All,
}

/// The live-page element(s) replaced by the assembled article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementTarget {
    pub selector: String,
    pub mode: ReplaceMode,
}

impl ReplacementTarget {
    pub fn single(selector: impl Into<String>) -> Self {
        Self { selector: selector.into(), mode: ReplaceMode::Single }
    }
}

/// Declarative description of one supported site.
#[derive(Debug, Clone)]
pub struct SiteDescriptor {
    pub id: String,
    pub url_rule: UrlRule,
    pub content_selector: String,
    pub last_page: LastPage,
    pub past_end: Option<PastEnd>,
    pub rules: Vec<ExtractionRule>,
    pub replacement: ReplacementTarget,
    pub container_class: Option<String>,
    /// Article URLs the descriptor is known to work on.
    pub test_urls: Vec<String>,
}

impl SiteDescriptor {
    pub fn builder(id: impl Into<String>, url_rule: UrlRule) -> SiteDescriptorBuilder {
        SiteDescriptorBuilder::new(id, url_rule)
    }

    /// Checks every selector the descriptor carries.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(UnpageError::SiteConfigError("descriptor has no host".to_string()));
        }
        if self.content_selector.trim().is_empty() {
            return Err(UnpageError::SiteConfigError(format!("{}: no content selector", self.id)));
        }
        parse_selector(&self.content_selector)?;
        check_rewrite_selector(&self.replacement.selector)?;

        if let LastPage::NextLink(rule) = &self.last_page {
            parse_selector(rule.selector())?;
        }
        if let Some(PastEnd::Matches { selector, .. }) = &self.past_end {
            parse_selector(selector)?;
        }
        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }
}

impl SiteAdapter for SiteDescriptor {
    fn id(&self) -> &str {
        &self.id
    }

    fn compute_template(&self, url: &str) -> Result<UrlTemplate> {
        self.url_rule.compute_template(url)
    }

    fn content_selector(&self) -> &str {
        &self.content_selector
    }

    fn is_past_last_page(&self, doc: &Document) -> Result<bool> {
        match &self.past_end {
            Some(past_end) => past_end.is_past_end(doc, &self.content_selector),
            None => Ok(false),
        }
    }

    fn extract(&self, doc: &Document, ctx: &PageContext<'_>) -> Result<FragmentSet> {
        extract_fragments(doc, &self.content_selector, &self.rules, ctx)
    }

    fn is_last_page(&self, doc: &Document, _fragments: &FragmentSet) -> Result<bool> {
        self.last_page.is_last_page(doc)
    }

    fn replacement_target(&self) -> &ReplacementTarget {
        &self.replacement
    }

    fn container_class(&self) -> Option<&str> {
        self.container_class.as_deref()
    }
}

/// Builder for SiteDescriptor.
///
/// # Example
///
/// ```rust
/// use unpage_core::{ExtractionRule, LastPage, NextLinkRule, SiteDescriptor, UrlRule};
///
/// let site = SiteDescriptor::builder("example.com", UrlRule::QueryParam { key: "page".into() })
///     .content("article .story")
///     .last_page(LastPage::NextLink(NextLinkRule::new("a.next").required_query_key("page")))
///     .rule(ExtractionRule::RemoveOnLaterPages("h1".into()))
///     .build()
///     .unwrap();
/// assert_eq!(site.replacement.selector, "article .story");
/// ```
pub struct SiteDescriptorBuilder {
    id: String,
    url_rule: UrlRule,
    content_selector: String,
    last_page: LastPage,
    past_end: Option<PastEnd>,
    rules: Vec<ExtractionRule>,
    replacement: Option<String>,
    mode: ReplaceMode,
    container_class: Option<String>,
    test_urls: Vec<String>,
}

impl SiteDescriptorBuilder {
    pub fn new(id: impl Into<String>, url_rule: UrlRule) -> Self {
        Self {
            id: id.into(),
            url_rule,
            content_selector: String::new(),
            last_page: LastPage::Never,
            past_end: None,
            rules: Vec::new(),
            replacement: None,
            mode: ReplaceMode::Single,
            container_class: None,
            test_urls: Vec::new(),
        }
    }

    /// Sets the article content selector.
    pub fn content(mut self, selector: impl Into<String>) -> Self {
        self.content_selector = selector.into();
        self
    }

    pub fn last_page(mut self, last_page: LastPage) -> Self {
        self.last_page = last_page;
        self
    }

    pub fn past_end(mut self, past_end: PastEnd) -> Self {
        self.past_end = Some(past_end);
        self
    }

    /// Appends an extraction rule; rules run in the order they are added.
    pub fn rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the live-page selector to replace (default: the content selector).
    pub fn replace(mut self, selector: impl Into<String>) -> Self {
        self.replacement = Some(selector.into());
        self
    }

    pub fn replace_all(mut self, all: bool) -> Self {
        self.mode = if all { ReplaceMode::All } else { ReplaceMode::Single };
        self
    }

    pub fn container_class(mut self, class: impl Into<String>) -> Self {
        self.container_class = Some(class.into());
        self
    }

    pub fn test_url(mut self, url: impl Into<String>) -> Self {
        self.test_urls.push(url.into());
        self
    }

    /// Builds and validates the descriptor.
    pub fn build(self) -> Result<SiteDescriptor> {
        let container_class = self
            .container_class
            .or_else(|| simple_class(&self.content_selector).map(str::to_string));
        let replacement = self.replacement.unwrap_or_else(|| self.content_selector.clone());

        let descriptor = SiteDescriptor {
            id: self.id,
            url_rule: self.url_rule,
            content_selector: self.content_selector,
            last_page: self.last_page,
            past_end: self.past_end,
            rules: self.rules,
            replacement: ReplacementTarget { selector: replacement, mode: self.mode },
            container_class,
            test_urls: self.test_urls,
        };
        descriptor.validate()?;

        Ok(descriptor)
    }
}

/// `.article-body` → `article-body`; anything more complex → `None`.
fn simple_class(selector: &str) -> Option<&str> {
    let class = selector.trim().strip_prefix('.')?;
    let simple = !class.is_empty() && class.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    simple.then_some(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::termination::NextLinkRule;

    #[test]
    fn test_builder_defaults() {
        let site = SiteDescriptor::builder("example.com", UrlRule::knowable_style())
            .content(".article-body")
            .build()
            .unwrap();

        assert_eq!(site.replacement, ReplacementTarget::single(".article-body"));
        assert_eq!(site.container_class.as_deref(), Some("article-body"));
        assert!(matches!(site.last_page, LastPage::Never));
    }

    #[test]
    fn test_builder_rejects_bad_selectors() {
        let missing = SiteDescriptor::builder("example.com", UrlRule::knowable_style()).build();
        assert!(matches!(missing, Err(UnpageError::SiteConfigError(_))));

        let bad_content = SiteDescriptor::builder("example.com", UrlRule::knowable_style())
            .content("div[[")
            .build();
        assert!(matches!(bad_content, Err(UnpageError::InvalidSelector { .. })));

        let bad_next = SiteDescriptor::builder("example.com", UrlRule::knowable_style())
            .content(".body")
            .last_page(LastPage::NextLink(NextLinkRule::new("a[[")))
            .build();
        assert!(matches!(bad_next, Err(UnpageError::InvalidSelector { .. })));
    }

    #[test]
    fn test_complex_selector_has_no_default_class() {
        let site = SiteDescriptor::builder("example.com", UrlRule::knowable_style())
            .content("article .story")
            .replace("#main")
            .replace_all(true)
            .build()
            .unwrap();
        assert_eq!(site.container_class, None);
        assert_eq!(site.replacement.mode, ReplaceMode::All);
    }

    #[test]
    fn test_past_end_defaults_to_false() {
        let site = SiteDescriptor::builder("example.com", UrlRule::knowable_style())
            .content(".body")
            .build()
            .unwrap();
        let doc = Document::parse("<p>nothing</p>");
        assert!(!site.is_past_last_page(&doc).unwrap());

        let site = SiteDescriptor::builder("example.com", UrlRule::knowable_style())
            .content(".body")
            .past_end(PastEnd::MissingContent)
            .build()
            .unwrap();
        assert!(site.is_past_last_page(&doc).unwrap());
    }
}
