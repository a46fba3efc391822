//! Article URL rewriting.
//!
//! Turns the URL of any page of an article into a [`UrlTemplate`] that can
//! produce the URL of every page. Each site picks one [`UrlRule`].

use url::{Url, form_urlencoded};

use crate::template::{PLACEHOLDER, UrlTemplate};
use crate::{Result, UnpageError};

const DEFAULT_SCHEME: &str = "http://";

/// How a site encodes the page number in its article URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRule {
    /// Page number is a trailing path segment, as in
    /// `http://host/a/article-title/p-3`.
    ///
    /// `marker` must sit at `marker_index` (counted with the host as segment
    /// 0); the segment after it is the article title and the one after that
    /// is the optional `<page_prefix><n>` suffix.
    PathSuffix { marker_index: usize, marker: String, page_prefix: String },
    /// Page number is a query parameter, as in `http://host/story?page=3`.
    QueryParam { key: String },
}

impl UrlRule {
    /// The `/a/<title>/p-<n>` grammar.
    pub fn knowable_style() -> Self {
        UrlRule::PathSuffix { marker_index: 1, marker: "a".to_string(), page_prefix: "p-".to_string() }
    }

    /// Computes the page template for a concrete article URL.
    ///
    /// Fails with [`UnpageError::NotAnArticleUrl`] when the URL doesn't have
    /// the shape this rule expects.
    pub fn compute_template(&self, url: &str) -> Result<UrlTemplate> {
        let raw = match self {
            UrlRule::PathSuffix { marker_index, marker, page_prefix } => {
                path_suffix_template(url, *marker_index, marker, page_prefix)?
            }
            UrlRule::QueryParam { key } => query_param_template(url, key)?,
        };

        let template = UrlTemplate::new(raw).map_err(|_| UnpageError::NotAnArticleUrl(url.to_string()))?;
        template
            .url_for(1)
            .map_err(|_| UnpageError::NotAnArticleUrl(url.to_string()))?;

        Ok(template)
    }
}

fn path_suffix_template(url: &str, marker_index: usize, marker: &str, page_prefix: &str) -> Result<String> {
    let not_article = || UnpageError::NotAnArticleUrl(url.to_string());

    let (scheme, rest) = match url.find("://") {
        Some(end) => url.split_at(end + 3),
        None => (DEFAULT_SCHEME, url),
    };

    let segments: Vec<&str> = rest.split('/').collect();
    let title_index = marker_index + 1;
    let article_len = title_index + 1;

    if segments.len() < article_len || segments[marker_index] != marker {
        return Err(not_article());
    }

    // Bare article URL. A query or fragment glued to the title would end up
    // in front of the page suffix, so it is dropped.
    if segments.len() == article_len {
        let title = strip_query_and_fragment(segments[title_index]);
        if title.is_empty() {
            return Err(not_article());
        }
        let base = segments[..title_index].join("/");
        return Ok(format!("{}{}/{}/{}{}", scheme, base, title, page_prefix, PLACEHOLDER));
    }

    // Trailing slash, nothing after it.
    if segments.len() == article_len + 1 && segments[article_len].is_empty() {
        return Ok(format!("{}{}{}{}", scheme, rest, page_prefix, PLACEHOLDER));
    }

    // Page suffix. Only the prefix is checked, case-insensitively, so
    // `p-10junk` and a bare `p-` are accepted as page suffixes. Sites rely on
    // the original case of the prefix, which is kept. Anything after the
    // prefix (digits, query, fragment, further segments) is dropped.
    let prefix = segments[article_len]
        .get(..page_prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(page_prefix))
        .ok_or_else(not_article)?;

    Ok(format!(
        "{}{}/{}{}",
        scheme,
        segments[..article_len].join("/"),
        prefix,
        PLACEHOLDER
    ))
}

fn strip_query_and_fragment(segment: &str) -> &str {
    match segment.find(['?', '#']) {
        Some(idx) => &segment[..idx],
        None => segment,
    }
}

fn query_param_template(url: &str, key: &str) -> Result<String> {
    let mut parsed = Url::parse(url).map_err(|_| UnpageError::NotAnArticleUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UnpageError::NotAnArticleUrl(url.to_string()));
    }

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed.set_fragment(None);
    parsed.set_query(None);

    let encoded_key: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
    let page_pair = format!("{}={}", encoded_key, PLACEHOLDER);

    let query = if kept.is_empty() {
        page_pair
    } else {
        let others = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish();
        format!("{}&{}", others, page_pair)
    };

    Ok(format!("{}?{}", parsed.as_str(), query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://www.knowable.com/a/article-title-here", "http://www.knowable.com/a/article-title-here/p-{0}")]
    #[case("http://www.knowable.com/a/article-title-here/", "http://www.knowable.com/a/article-title-here/p-{0}")]
    #[case("http://www.knowable.com/a/article-title-here/p-10", "http://www.knowable.com/a/article-title-here/p-{0}")]
    #[case("http://www.knowable.com/a/article-title-here/p-10/", "http://www.knowable.com/a/article-title-here/p-{0}")]
    #[case(
        "http://www.knowable.com/a/article-title-here/p-10#something",
        "http://www.knowable.com/a/article-title-here/p-{0}"
    )]
    #[case("http://www.knowable.com/a/article-title-here/p-10?x=y", "http://www.knowable.com/a/article-title-here/p-{0}")]
    #[case("https://knowable.com/a/title?ref=home", "https://knowable.com/a/title/p-{0}")]
    #[case("www.knowable.com/a/title", "http://www.knowable.com/a/title/p-{0}")]
    #[case("http://www.knowable.com/a/title/P-4", "http://www.knowable.com/a/title/P-{0}")]
    #[case("http://www.knowable.com/a/title/p-", "http://www.knowable.com/a/title/p-{0}")]
    fn test_path_suffix_templates(#[case] url: &str, #[case] expected: &str) {
        let template = UrlRule::knowable_style().compute_template(url).unwrap();
        assert_eq!(template.as_str(), expected);
    }

    #[rstest]
    #[case("http://www.knowable.com/")]
    #[case("http://www.knowable.com/b/title")]
    #[case("http://www.knowable.com/a")]
    #[case("http://www.knowable.com/a/title/page-2")]
    #[case("http://www.knowable.com/a/title/?x=y")]
    #[case("http://www.knowable.com/a/?x=y")]
    fn test_path_suffix_rejects_other_shapes(#[case] url: &str) {
        let result = UrlRule::knowable_style().compute_template(url);
        assert!(matches!(result, Err(UnpageError::NotAnArticleUrl(_))));
    }

    #[test]
    fn test_bare_url_first_page_matches_input() {
        let template = UrlRule::knowable_style()
            .compute_template("http://www.example.com/a/title")
            .unwrap();
        assert_eq!(template.render(1), "http://www.example.com/a/title/p-1");
    }

    #[test]
    fn test_unanchored_suffix_quirk() {
        let template = UrlRule::knowable_style()
            .compute_template("http://www.knowable.com/a/title/p-10junk")
            .unwrap();
        assert_eq!(template.render(2), "http://www.knowable.com/a/title/p-2");
    }

    #[test]
    fn test_custom_marker_position() {
        let rule =
            UrlRule::PathSuffix { marker_index: 2, marker: "story".to_string(), page_prefix: "page".to_string() };
        let template = rule
            .compute_template("https://news.example.org/world/story/big-news/page3")
            .unwrap();
        assert_eq!(template.as_str(), "https://news.example.org/world/story/big-news/page{0}");
    }

    #[test]
    fn test_query_param_template() {
        let rule = UrlRule::QueryParam { key: "page".to_string() };

        let template = rule.compute_template("https://example.org/story?id=7&page=3#top").unwrap();
        assert_eq!(template.as_str(), "https://example.org/story?id=7&page={0}");
        assert_eq!(template.render(1), "https://example.org/story?id=7&page=1");

        let template = rule.compute_template("https://example.org/story").unwrap();
        assert_eq!(template.as_str(), "https://example.org/story?page={0}");
    }

    #[test]
    fn test_query_param_rejects_relative_url() {
        let rule = UrlRule::QueryParam { key: "page".to_string() };
        assert!(matches!(
            rule.compute_template("/story?page=2"),
            Err(UnpageError::NotAnArticleUrl(_))
        ));
        assert!(matches!(
            rule.compute_template("ftp://example.org/story"),
            Err(UnpageError::NotAnArticleUrl(_))
        ));
    }
}
