//! knowable.com
//!
//! Articles are slide galleries:
//!
//! ```text
//! http://www.knowable.com/a/article-title-here
//! http://www.knowable.com/a/article-title-here/
//! http://www.knowable.com/a/article-title-here/p-10
//! http://www.knowable.com/a/article-title-here/p-10/
//! http://www.knowable.com/a/article-title-here/p-10#something
//! http://www.knowable.com/a/article-title-here/p-10?x=y
//! ```
//!
//! Each page holds one `.article-body`. A page is the last one when its
//! `.btn-next-xl` control is missing or points at `/t/end-gallery`.

use crate::extract::ExtractionRule;
use crate::rewrite::UrlRule;
use crate::sites::{ReplacementTarget, SiteDescriptor};
use crate::termination::{LastPage, NextLinkRule};

pub const HOST: &str = "knowable.com";
pub const CONTENT_SELECTOR: &str = ".article-body";
pub const NEXT_SELECTOR: &str = ".article-body .btn-next-xl";
pub const END_OF_GALLERY: &str = "/t/end-gallery";

pub fn descriptor() -> SiteDescriptor {
    SiteDescriptor {
        id: HOST.to_string(),
        url_rule: UrlRule::knowable_style(),
        content_selector: CONTENT_SELECTOR.to_string(),
        last_page: LastPage::NextLink(NextLinkRule::new(NEXT_SELECTOR).end_href(END_OF_GALLERY)),
        past_end: None,
        rules: vec![
            ExtractionRule::Hide(".btn-next-xl".to_string()),
            ExtractionRule::ResolveLazyImages { attr: "data-src".to_string() },
            ExtractionRule::AbsoluteUrls,
        ],
        replacement: ReplacementTarget::single(CONTENT_SELECTOR),
        container_class: Some("article-body".to_string()),
        test_urls: vec!["http://www.knowable.com/a/article-title-here".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PageContext;
    use crate::parse::Document;
    use crate::sites::SiteAdapter;

    #[test]
    fn test_descriptor_is_valid() {
        descriptor().validate().unwrap();
    }

    #[test]
    fn test_test_urls_rewrite() {
        let site = descriptor();
        for url in &site.test_urls {
            let template = site.compute_template(url).unwrap();
            assert!(template.render(1).ends_with("/p-1"));
        }
    }

    #[test]
    fn test_page_extraction() {
        let site = descriptor();
        let doc = Document::parse(
            r#"<html><body>
                <div class="article-body">
                    <p>Slide 2</p>
                    <img data-src="/img/2.jpg">
                    <a class="btn-next-xl" href="/a/title/p-3">Next</a>
                </div>
            </body></html>"#,
        );
        let url = url::Url::parse("http://www.knowable.com/a/title/p-2").unwrap();

        let fragments = site.extract(&doc, &PageContext { page: 2, url: Some(&url) }).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].contains(r#"src="http://www.knowable.com/img/2.jpg""#));
        assert!(fragments[0].contains("display:none"));
        assert!(!site.is_last_page(&doc, &fragments).unwrap());
    }
}
