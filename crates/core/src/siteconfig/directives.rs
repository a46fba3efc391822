use crate::error::{Result, UnpageError};
use crate::extract::ExtractionRule;
use crate::rewrite::UrlRule;
use crate::sites::SiteDescriptor;
use crate::termination::{LastPage, NextLinkRule, PastEnd};

/// Represents a single descriptor-file directive
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Host the descriptor is registered under
    Host(String),

    /// URL rewriting
    UrlRule(String),
    PathMarker(usize, String),
    PagePrefix(String),
    PageParam(String),

    /// Content selection and replacement
    Content(String),
    Replace(String),
    ReplaceAll(bool),
    ContainerClass(String),

    /// Termination
    NextLink(String),
    EndHref(String),
    NextRequiresParam(String),
    NextArticleText(String),
    LastPage(String),
    PastEnd(String),
    PastEndText(String),
    PastEndMissingContent(bool),

    /// Extraction rules
    Strip(String),
    Hide(String),
    StripOnLaterPages(String),
    LazyImageAttr(String),
    AbsoluteUrls(bool),

    /// Testing
    TestUrl(String),
}

/// Extraction rule as it appeared in the file, so order survives merging
#[derive(Debug, Clone, PartialEq)]
enum RuleDirective {
    Strip(String),
    Hide(String),
    StripOnLaterPages(String),
    LazyImageAttr(String),
}

/// Raw directives collected for one host
#[derive(Debug, Clone, Default)]
pub struct SiteConfig {
    pub host: Option<String>,

    pub url_rule: Option<String>,
    pub path_marker: Option<(usize, String)>,
    pub page_prefix: Option<String>,
    pub page_param: Option<String>,

    pub content: Option<String>,
    pub replace: Option<String>,
    pub replace_all: Option<bool>,
    pub container_class: Option<String>,

    pub next_link: Option<String>,
    pub end_hrefs: Vec<String>,
    pub next_requires_param: Option<String>,
    pub next_article_text: Option<String>,
    pub last_page: Option<String>,
    pub past_end: Option<String>,
    pub past_end_text: Option<String>,
    pub past_end_missing_content: Option<bool>,

    rules: Vec<RuleDirective>,
    pub absolute_urls: Option<bool>,

    pub test_urls: Vec<String>,
}

impl SiteConfig {
    /// Create a new empty site config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive to this config
    pub fn add_directive(&mut self, directive: Directive) {
        match directive {
            Directive::Host(host) => self.host = Some(host),

            Directive::UrlRule(rule) => self.url_rule = Some(rule),
            Directive::PathMarker(index, marker) => self.path_marker = Some((index, marker)),
            Directive::PagePrefix(prefix) => self.page_prefix = Some(prefix),
            Directive::PageParam(key) => self.page_param = Some(key),

            Directive::Content(sel) => self.content = Some(sel),
            Directive::Replace(sel) => self.replace = Some(sel),
            Directive::ReplaceAll(value) => self.replace_all = Some(value),
            Directive::ContainerClass(class) => self.container_class = Some(class),

            Directive::NextLink(sel) => self.next_link = Some(sel),
            Directive::EndHref(href) => self.end_hrefs.push(href),
            Directive::NextRequiresParam(key) => self.next_requires_param = Some(key),
            Directive::NextArticleText(pattern) => self.next_article_text = Some(pattern),
            Directive::LastPage(mode) => self.last_page = Some(mode),
            Directive::PastEnd(sel) => self.past_end = Some(sel),
            Directive::PastEndText(pattern) => self.past_end_text = Some(pattern),
            Directive::PastEndMissingContent(value) => self.past_end_missing_content = Some(value),

            Directive::Strip(sel) => self.rules.push(RuleDirective::Strip(sel)),
            Directive::Hide(sel) => self.rules.push(RuleDirective::Hide(sel)),
            Directive::StripOnLaterPages(sel) => self.rules.push(RuleDirective::StripOnLaterPages(sel)),
            Directive::LazyImageAttr(attr) => self.rules.push(RuleDirective::LazyImageAttr(attr)),
            Directive::AbsoluteUrls(value) => self.absolute_urls = Some(value),

            Directive::TestUrl(url) => self.test_urls.push(url),
        }
    }

    /// Merge a lower-priority config into this one.
    ///
    /// Single-valued settings already present here win; lists are appended.
    pub fn merge(&mut self, other: &SiteConfig) {
        fn fill<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(other);
            }
        }

        fill(&mut self.host, &other.host);
        fill(&mut self.url_rule, &other.url_rule);
        fill(&mut self.path_marker, &other.path_marker);
        fill(&mut self.page_prefix, &other.page_prefix);
        fill(&mut self.page_param, &other.page_param);
        fill(&mut self.content, &other.content);
        fill(&mut self.replace, &other.replace);
        fill(&mut self.replace_all, &other.replace_all);
        fill(&mut self.container_class, &other.container_class);
        fill(&mut self.next_link, &other.next_link);
        fill(&mut self.next_requires_param, &other.next_requires_param);
        fill(&mut self.next_article_text, &other.next_article_text);
        fill(&mut self.last_page, &other.last_page);
        fill(&mut self.past_end, &other.past_end);
        fill(&mut self.past_end_text, &other.past_end_text);
        fill(&mut self.past_end_missing_content, &other.past_end_missing_content);
        fill(&mut self.absolute_urls, &other.absolute_urls);

        self.end_hrefs.extend(other.end_hrefs.iter().cloned());
        self.rules.extend(other.rules.iter().cloned());
        self.test_urls.extend(other.test_urls.iter().cloned());
    }

    /// Check if this config is effectively empty
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.url_rule.is_none() && self.next_link.is_none() && self.rules.is_empty()
    }

    /// Build a validated descriptor; `default_host` is used when the file
    /// carries no `host` directive.
    pub fn to_descriptor(&self, default_host: &str) -> Result<SiteDescriptor> {
        let host = self.host.as_deref().unwrap_or(default_host);
        let content = self
            .content
            .as_deref()
            .ok_or_else(|| UnpageError::SiteConfigError(format!("{}: missing `content` directive", host)))?;

        let mut builder = SiteDescriptor::builder(host, self.build_url_rule(host)?)
            .content(content)
            .last_page(self.build_last_page(host)?);

        if let Some(past_end) = self.build_past_end()? {
            builder = builder.past_end(past_end);
        }

        for rule in &self.rules {
            builder = builder.rule(match rule {
                RuleDirective::Strip(sel) => ExtractionRule::Remove(sel.clone()),
                RuleDirective::Hide(sel) => ExtractionRule::Hide(sel.clone()),
                RuleDirective::StripOnLaterPages(sel) => ExtractionRule::RemoveOnLaterPages(sel.clone()),
                RuleDirective::LazyImageAttr(attr) => ExtractionRule::ResolveLazyImages { attr: attr.clone() },
            });
        }
        if self.absolute_urls.unwrap_or(true) {
            builder = builder.rule(ExtractionRule::AbsoluteUrls);
        }

        if let Some(replace) = &self.replace {
            builder = builder.replace(replace.clone());
        }
        if let Some(class) = &self.container_class {
            builder = builder.container_class(class.clone());
        }
        for url in &self.test_urls {
            builder = builder.test_url(url.clone());
        }

        builder.replace_all(self.replace_all.unwrap_or(false)).build()
    }

    fn build_url_rule(&self, host: &str) -> Result<UrlRule> {
        match self.url_rule.as_deref().unwrap_or("path_suffix") {
            "path_suffix" => {
                let (marker_index, marker) = self.path_marker.clone().unwrap_or((1, "a".to_string()));
                let page_prefix = self.page_prefix.clone().unwrap_or_else(|| "p-".to_string());
                Ok(UrlRule::PathSuffix { marker_index, marker, page_prefix })
            }
            "query_param" => Ok(UrlRule::QueryParam { key: self.page_param.clone().unwrap_or_else(|| "page".to_string()) }),
            other => Err(UnpageError::SiteConfigError(format!("{}: unknown url_rule `{}`", host, other))),
        }
    }

    fn build_last_page(&self, host: &str) -> Result<LastPage> {
        match (self.last_page.as_deref(), &self.next_link) {
            (Some("never"), _) => Ok(LastPage::Never),
            (Some("always"), _) => Ok(LastPage::Always),
            (Some("next_link") | None, Some(selector)) => {
                let mut rule = NextLinkRule::new(selector.clone());
                for href in &self.end_hrefs {
                    rule = rule.end_href(href.clone());
                }
                if let Some(key) = &self.next_requires_param {
                    rule = rule.required_query_key(key.clone());
                }
                if let Some(pattern) = &self.next_article_text {
                    rule = rule.next_article_text(pattern)?;
                }
                Ok(LastPage::NextLink(rule))
            }
            (Some("next_link") | None, None) => Err(UnpageError::SiteConfigError(format!(
                "{}: no `next_link` and no `last_page` mode",
                host
            ))),
            (Some(other), _) => Err(UnpageError::SiteConfigError(format!(
                "{}: unknown last_page mode `{}`",
                host, other
            ))),
        }
    }

    fn build_past_end(&self) -> Result<Option<PastEnd>> {
        if let Some(selector) = &self.past_end {
            return match &self.past_end_text {
                Some(pattern) => PastEnd::matches_text(selector.clone(), pattern).map(Some),
                None => Ok(Some(PastEnd::matches(selector.clone()))),
            };
        }
        if self.past_end_missing_content.unwrap_or(false) {
            return Ok(Some(PastEnd::MissingContent));
        }
        Ok(None)
    }
}

/// Parse a directive line from descriptor file format
pub fn parse_directive(line: &str) -> Result<Directive> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(UnpageError::SiteConfigError("Empty or comment line".to_string()));
    }

    let Some((key, value)) = line.split_once(':') else {
        return Err(UnpageError::SiteConfigError(format!("Invalid directive format: {}", line)));
    };
    let key = key.trim();
    let value = value.trim();

    if value.is_empty() {
        return Err(UnpageError::SiteConfigError(format!("Missing value for {}", key)));
    }

    match key {
        "host" => Ok(Directive::Host(value.to_lowercase())),

        "url_rule" => Ok(Directive::UrlRule(value.to_lowercase())),
        "path_marker" => {
            let (index, marker) = value
                .split_once(char::is_whitespace)
                .ok_or_else(|| UnpageError::SiteConfigError(format!("Invalid path_marker format: {}", value)))?;
            let index = index
                .parse::<usize>()
                .map_err(|_| UnpageError::SiteConfigError(format!("Invalid path_marker index: {}", index)))?;
            if index == 0 {
                return Err(UnpageError::SiteConfigError("path_marker index 0 is the host".to_string()));
            }
            Ok(Directive::PathMarker(index, marker.trim().to_string()))
        }
        "page_prefix" => Ok(Directive::PagePrefix(value.to_string())),
        "page_param" => Ok(Directive::PageParam(value.to_string())),

        "content" => Ok(Directive::Content(value.to_string())),
        "replace" => Ok(Directive::Replace(value.to_string())),
        "replace_all" => Ok(Directive::ReplaceAll(parse_boolean(value)?)),
        "container_class" => Ok(Directive::ContainerClass(value.to_string())),

        "next_link" => Ok(Directive::NextLink(value.to_string())),
        "end_href" => Ok(Directive::EndHref(value.to_string())),
        "next_requires_param" => Ok(Directive::NextRequiresParam(value.to_string())),
        "next_article_text" => Ok(Directive::NextArticleText(value.to_string())),
        "last_page" => Ok(Directive::LastPage(value.to_lowercase())),
        "past_end" => Ok(Directive::PastEnd(value.to_string())),
        "past_end_text" => Ok(Directive::PastEndText(value.to_string())),
        "past_end_missing_content" => Ok(Directive::PastEndMissingContent(parse_boolean(value)?)),

        "strip" => Ok(Directive::Strip(value.to_string())),
        "hide" => Ok(Directive::Hide(value.to_string())),
        "strip_on_later_pages" => Ok(Directive::StripOnLaterPages(value.to_string())),
        "lazy_image_attr" => Ok(Directive::LazyImageAttr(value.to_string())),
        "absolute_urls" => Ok(Directive::AbsoluteUrls(parse_boolean(value)?)),

        "test_url" => Ok(Directive::TestUrl(value.to_string())),

        _ => Err(UnpageError::SiteConfigError(format!("Unknown directive: {}", key))),
    }
}

/// Parse a boolean value from descriptor file format
fn parse_boolean(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(UnpageError::SiteConfigError(format!(
            "Invalid boolean value: {}",
            value
        ))),
    }
}
