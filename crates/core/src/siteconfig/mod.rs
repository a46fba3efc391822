//! Site descriptor files.
//!
//! Sites beyond the built-in ones are described in plain `key: value`
//! files, one per host:
//!
//! ```text
//! # example.com.txt
//! url_rule: query_param
//! page_param: page
//! content: article .story
//! next_link: a.next
//! next_requires_param: page
//! strip_on_later_pages: h1
//! ```
//!
//! [`ConfigLoader`] finds the files for a host, [`ConfigParser`] reads them
//! and [`SiteConfig::to_descriptor`] turns the result into a
//! [`SiteDescriptor`](crate::SiteDescriptor).

pub mod directives;
pub mod loader;
pub mod parser;

pub use directives::{Directive, SiteConfig};
pub use loader::{ConfigLoader, ConfigLoaderBuilder};
pub use parser::ConfigParser;
