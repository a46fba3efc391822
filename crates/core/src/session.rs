//! The pagination driver.
//!
//! A session rewrites the article URL once, then fetches pages strictly in
//! order, feeding each through the site's termination checks and extractor
//! into an append-only [`Accumulator`]. When the last page is reached the
//! accumulated fragments are wrapped in a single container and, for
//! [`Paginator::run_session`], swapped into the live page exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use unpage_core::{FetchConfig, HttpFetcher, Paginator, SessionConfig, SiteRegistry};
//!
//! # async fn example() -> unpage_core::Result<()> {
//! let url = "http://www.knowable.com/a/article-title-here";
//! let registry = SiteRegistry::builtin();
//! let site = registry.lookup(url).expect("supported site");
//!
//! let fetcher = Arc::new(HttpFetcher::new(FetchConfig::default())?);
//! let paginator = Paginator::new(fetcher, SessionConfig::default());
//! let assembly = paginator.collect(url, site.as_ref(), &CancellationToken::new()).await?;
//! println!("{} pages", assembly.pages_loaded);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::apply::{PageTransport, apply_replacement};
use crate::extract::{FragmentSet, PageContext};
use crate::fetch::PageFetcher;
use crate::parse::Document;
use crate::report::{NullReporter, ProgressReporter};
use crate::sites::SiteAdapter;
use crate::template::UrlTemplate;
use crate::{Result, UnpageError};

/// Id of the container element that holds the assembled article.
pub const DEFAULT_CONTAINER_ID: &str = "newArticleBody";

/// Limits and naming for pagination sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum pages fetched before giving up (default: 50).
    pub max_pages: u32,
    /// Wall-clock limit for the whole session (default: 300 s).
    pub session_timeout: Option<Duration>,
    /// Id given to the assembled container.
    pub container_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            session_timeout: Some(Duration::from_secs(300)),
            container_id: DEFAULT_CONTAINER_ID.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }
}

/// Builder for SessionConfig.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use unpage_core::SessionConfig;
///
/// let config = SessionConfig::builder()
///     .max_pages(20)
///     .session_timeout(Some(Duration::from_secs(60)))
///     .build();
/// assert_eq!(config.max_pages, 20);
/// ```
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self { config: SessionConfig::default() }
    }

    pub fn max_pages(mut self, value: u32) -> Self {
        self.config.max_pages = value;
        self
    }

    /// `None` disables the session-wide timeout.
    pub fn session_timeout(mut self, value: Option<Duration>) -> Self {
        self.config.session_timeout = value;
        self
    }

    pub fn container_id(mut self, value: impl Into<String>) -> Self {
        self.config.container_id = value.into();
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One page's contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub page: u32,
    pub html: String,
}

/// Append-only, page-ordered fragment store.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    fragments: Vec<Fragment>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page's fragments after everything already held.
    pub fn append(&mut self, page: u32, set: FragmentSet) {
        self.fragments
            .extend(set.into_iter().map(|html| Fragment { page, html }));
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Wraps every fragment, in order, in one `<div>`.
    pub fn to_markup(&self, id: &str, class: Option<&str>) -> String {
        let mut markup = format!(r#"<div id="{}""#, escape_attr(id));
        if let Some(class) = class {
            markup.push_str(&format!(r#" class="{}""#, escape_attr(class)));
        }
        markup.push('>');
        for fragment in &self.fragments {
            markup.push_str(&fragment.html);
        }
        markup.push_str("</div>");
        markup
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Result of a finished fetch loop.
#[derive(Debug, Clone, Serialize)]
pub struct Assembly {
    pub site: String,
    pub template: String,
    pub pages_loaded: u32,
    pub page_urls: Vec<String>,
    pub fragments: usize,
    /// Outer HTML of the assembled container.
    pub markup: String,
}

/// Terminal state of [`Paginator::run_session`].
#[derive(Debug)]
pub enum SessionOutcome {
    Succeeded { pages_loaded: u32, replaced: usize },
    Failed { reason: UnpageError },
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Succeeded { .. })
    }

    pub fn pages_loaded(&self) -> Option<u32> {
        match self {
            SessionOutcome::Succeeded { pages_loaded, .. } => Some(*pages_loaded),
            SessionOutcome::Failed { .. } => None,
        }
    }

    /// Message for the status line.
    pub fn message(&self) -> String {
        match self {
            SessionOutcome::Succeeded { pages_loaded: 1, .. } => "Loaded 1 page".to_string(),
            SessionOutcome::Succeeded { pages_loaded, .. } => format!("Loaded {} pages", pages_loaded),
            SessionOutcome::Failed { reason } => reason.user_message().to_string(),
        }
    }
}

/// What the driver does after looking at a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    /// The page is past the end; it was not accumulated.
    PastEnd,
    /// The page was accumulated and more follow.
    Continue,
    /// The page was accumulated and is the last one.
    Last,
}

/// State of one run of the loop.
pub struct PaginationSession<'a> {
    site: &'a dyn SiteAdapter,
    template: UrlTemplate,
    accumulator: Accumulator,
    current_page: u32,
    requested: Vec<String>,
}

impl<'a> PaginationSession<'a> {
    /// Computes the URL template; fails fast on a URL the site doesn't know.
    pub fn start(url: &str, site: &'a dyn SiteAdapter) -> Result<Self> {
        let template = site.compute_template(url)?;
        tracing::debug!(site = site.id(), template = %template, "computed page template");

        Ok(Self { site, template, accumulator: Accumulator::new(), current_page: 1, requested: Vec::new() })
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// URLs handed to the fetcher so far, in order.
    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    /// URL of the current page, recorded as requested.
    pub fn next_url(&mut self) -> Result<Url> {
        let url = self.template.url_for(self.current_page)?;
        self.requested.push(url.to_string());
        Ok(url)
    }

    /// Runs the termination checks and extractor over the current page.
    ///
    /// Kept synchronous so the parsed document never lives across an await.
    pub fn ingest(&mut self, html: &str, page_url: &Url) -> Result<PageStep> {
        let doc = Document::parse(html);

        if self.site.is_past_last_page(&doc)? {
            tracing::debug!(page = self.current_page, "page is past the end of the article");
            return Ok(PageStep::PastEnd);
        }

        let ctx = PageContext { page: self.current_page, url: Some(page_url) };
        let fragments = self.site.extract(&doc, &ctx)?;
        let is_last = self.site.is_last_page(&doc, &fragments)?;

        tracing::debug!(
            page = self.current_page,
            fragments = fragments.len(),
            is_last,
            "accumulated page"
        );
        self.accumulator.append(self.current_page, fragments);

        Ok(if is_last { PageStep::Last } else { PageStep::Continue })
    }

    pub fn advance(&mut self) {
        self.current_page += 1;
    }

    /// Wraps up; `pages_loaded` is the last accumulated page number.
    pub fn finish(self, pages_loaded: u32, config: &SessionConfig) -> Assembly {
        let markup = self
            .accumulator
            .to_markup(&config.container_id, self.site.container_class());

        Assembly {
            site: self.site.id().to_string(),
            template: self.template.to_string(),
            pages_loaded,
            page_urls: self.requested,
            fragments: self.accumulator.len(),
            markup,
        }
    }
}

/// Runs pagination sessions, one at a time.
pub struct Paginator {
    fetcher: Arc<dyn PageFetcher>,
    config: SessionConfig,
    lock: Mutex<()>,
}

impl Paginator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: SessionConfig) -> Self {
        Self { fetcher, config, lock: Mutex::new(()) }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Fetches and assembles every page of the article without touching any
    /// live page.
    ///
    /// # Errors
    ///
    /// [`UnpageError::SessionBusy`] if a session is already running on this
    /// paginator; otherwise whatever stopped the loop.
    pub async fn collect(&self, url: &str, site: &dyn SiteAdapter, cancel: &CancellationToken) -> Result<Assembly> {
        let _guard = self.lock.try_lock().map_err(|_| UnpageError::SessionBusy)?;
        let session = PaginationSession::start(url, site)?;
        self.collect_guarded(session, site, cancel, &NullReporter).await
    }

    /// Full session: collect, then replace the target on the live page.
    ///
    /// Never returns an error; every failure becomes
    /// [`SessionOutcome::Failed`] and is reported through `reporter`. Nothing
    /// is replaced unless every page was fetched and extracted.
    pub async fn run_session(
        &self, url: &str, site: &dyn SiteAdapter, transport: &mut dyn PageTransport, reporter: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let Ok(guard) = self.lock.try_lock() else {
            let reason = UnpageError::SessionBusy;
            reporter.result(reason.user_message(), false);
            return SessionOutcome::Failed { reason };
        };

        // A malformed URL fails before any loading status goes out.
        let outcome = match PaginationSession::start(url, site) {
            Ok(session) => {
                reporter.button_note("Working...");
                reporter.status("Loading all pages...");
                let outcome = self.load_and_replace(session, site, transport, reporter, cancel).await;
                reporter.button_note("");
                outcome
            }
            Err(reason) => SessionOutcome::Failed { reason },
        };
        drop(guard);

        if let SessionOutcome::Failed { reason } = &outcome {
            tracing::warn!(site = site.id(), url, error = %reason, "session failed");
        }

        reporter.result(&outcome.message(), true);
        outcome
    }

    async fn load_and_replace(
        &self, session: PaginationSession<'_>, site: &dyn SiteAdapter, transport: &mut dyn PageTransport,
        reporter: &dyn ProgressReporter, cancel: &CancellationToken,
    ) -> SessionOutcome {
        let assembly = match self.collect_guarded(session, site, cancel, reporter).await {
            Ok(assembly) => assembly,
            Err(reason) => return SessionOutcome::Failed { reason },
        };

        match apply_replacement(transport, site.replacement_target(), &assembly.markup).await {
            Ok(replaced) => {
                tracing::info!(site = site.id(), pages = assembly.pages_loaded, replaced, "article replaced");
                SessionOutcome::Succeeded { pages_loaded: assembly.pages_loaded, replaced }
            }
            Err(reason) => SessionOutcome::Failed { reason },
        }
    }

    async fn collect_guarded(
        &self, session: PaginationSession<'_>, site: &dyn SiteAdapter, cancel: &CancellationToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<Assembly> {
        let work = self.fetch_loop(session, site, cancel, reporter);

        match self.config.session_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| UnpageError::SessionTimeout { timeout: limit.as_secs() })?,
            None => work.await,
        }
    }

    async fn fetch_loop(
        &self, mut session: PaginationSession<'_>, site: &dyn SiteAdapter, cancel: &CancellationToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<Assembly> {

        let pages_loaded = loop {
            let page = session.current_page();
            if page > self.config.max_pages {
                return Err(UnpageError::PageLimitExceeded { limit: self.config.max_pages });
            }

            let page_url = session.next_url()?;
            reporter.status_secondary(&format!("Loading page {}", page));

            let html = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UnpageError::Cancelled),
                fetched = self.fetcher.fetch(page_url.as_str()) => fetched?,
            };

            match session.ingest(&html, &page_url)? {
                PageStep::PastEnd if page == 1 => return Err(UnpageError::NoContent),
                PageStep::PastEnd => break page - 1,
                PageStep::Last => break page,
                PageStep::Continue => session.advance(),
            }
        };

        tracing::info!(site = site.id(), pages = pages_loaded, "assembled article");
        Ok(session.finish(pages_loaded, &self.config))
    }
}
