pub mod apply;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod parse;
pub mod report;
pub mod rewrite;
pub mod session;
pub mod siteconfig;
pub mod sites;
pub mod template;
pub mod termination;

pub use apply::{PageTransport, StaticDocument, TransportResponse, apply_replacement};
pub use error::{Result, UnpageError};
pub use extract::{ExtractionRule, FragmentSet, PageContext, extract_fragments};
#[cfg(feature = "fetch")]
pub use fetch::{HttpFetcher, fetch_url};
pub use fetch::{FetchConfig, PageFetcher, fetch_file, fetch_stdin};
pub use parse::{Document, Element};
pub use report::{NullReporter, ProgressReporter, TracingReporter};
pub use rewrite::UrlRule;
pub use session::{
    Accumulator, Assembly, DEFAULT_CONTAINER_ID, Fragment, PageStep, PaginationSession, Paginator, SessionConfig,
    SessionConfigBuilder, SessionOutcome,
};
pub use siteconfig::{ConfigLoader, ConfigLoaderBuilder, ConfigParser, Directive, SiteConfig};
pub use sites::{ReplaceMode, ReplacementTarget, SiteAdapter, SiteDescriptor, SiteDescriptorBuilder, SiteRegistry, host_key};
pub use template::UrlTemplate;
pub use termination::{LastPage, NextLinkRule, PastEnd};
