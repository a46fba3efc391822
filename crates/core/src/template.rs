//! Page URL templates.
//!
//! A [`UrlTemplate`] is a URL with exactly one `{0}` slot that receives the
//! page number.

use std::fmt;

use url::Url;

use crate::{Result, UnpageError};

/// The page-number placeholder.
pub const PLACEHOLDER: &str = "{0}";

/// A fetch-URL template holding exactly one [`PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
}

impl UrlTemplate {
    /// Wraps a template string, rejecting anything without exactly one slot.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        match raw.matches(PLACEHOLDER).count() {
            1 => Ok(Self { raw }),
            n => Err(UnpageError::InvalidTemplate(format!(
                "expected one {} placeholder, found {} in {}",
                PLACEHOLDER, n, raw
            ))),
        }
    }

    /// Substitutes the page number into the template.
    pub fn render(&self, page: u32) -> String {
        self.raw.replacen(PLACEHOLDER, &page.to_string(), 1)
    }

    /// Renders the template and checks the result is an absolute URL.
    pub fn url_for(&self, page: u32) -> Result<Url> {
        let rendered = self.render(page);
        Url::parse(&rendered).map_err(|e| UnpageError::InvalidUrl(format!("{}: {}", rendered, e)))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_page() {
        let template = UrlTemplate::new("http://www.example.com/a/title/p-{0}").unwrap();
        assert_eq!(template.render(1), "http://www.example.com/a/title/p-1");
        assert_eq!(template.render(12), "http://www.example.com/a/title/p-12");
    }

    #[test]
    fn test_rejects_missing_or_repeated_placeholder() {
        assert!(matches!(
            UrlTemplate::new("http://example.com/a/title"),
            Err(UnpageError::InvalidTemplate(_))
        ));
        assert!(matches!(
            UrlTemplate::new("http://example.com/{0}/{0}"),
            Err(UnpageError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_url_for_requires_absolute_url() {
        let template = UrlTemplate::new("/a/title/p-{0}").unwrap();
        assert!(matches!(template.url_for(1), Err(UnpageError::InvalidUrl(_))));

        let template = UrlTemplate::new("https://example.com/story?page={0}").unwrap();
        assert_eq!(template.url_for(3).unwrap().query(), Some("page=3"));
    }
}
