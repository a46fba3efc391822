//! HTML parsing and DOM queries.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! extractor and the termination predicates to look at fetched pages.
//!
//! # Example
//!
//! ```rust
//! use unpage_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <div class="article-body"><p>Slide one</p></div>
//!             <a class="btn-next-xl" href="/a/title/p-2">Next</a>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! let next = doc.select_first("a.btn-next-xl").unwrap();
//! assert_eq!(next.and_then(|el| el.attr("href").map(String::from)), Some("/a/title/p-2".to_string()));
//! ```

use scraper::{Html, Selector};

use crate::{Result, UnpageError};

/// Parses a CSS selector, mapping failures to [`UnpageError::InvalidSelector`].
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| UnpageError::InvalidSelector { selector: selector.to_string(), reason: e.to_string() })
}

/// A parsed HTML page.
///
/// A Document is detached: it is built from fetched text and never touches
/// the live page.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document. html5ever recovers from malformed input,
    /// so this never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Gets the raw HTML representation.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serializes the document back to a string.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`UnpageError::InvalidSelector`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use unpage_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html);
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Selects the first element matching a CSS selector.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).next().map(|el| Element { element: el }))
    }

    /// Gets the title of the document.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the outer HTML of this element, including its own tags.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the concatenated text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute, or `None` if it is not present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name of this element.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }
}
