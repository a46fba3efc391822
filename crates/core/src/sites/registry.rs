use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::sites::{SiteAdapter, knowable};

static HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:https?|ftp)://)?(?:www\.)*([^:/\s?#]+)").expect("hardcoded host pattern is valid")
});

/// Extracts the key a site is registered under from a URL.
///
/// The scheme, any run of leading `www.` labels, the port and the path are
/// dropped, and the host is lowercased: `http://www.Knowable.com:80/a/x`
/// gives `knowable.com`.
pub fn host_key(url: &str) -> Option<String> {
    HOST_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Lookup table of supported sites, keyed by host.
#[derive(Clone, Default)]
pub struct SiteRegistry {
    sites: HashMap<String, Arc<dyn SiteAdapter>>,
}

impl SiteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sites compiled into the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(knowable::descriptor());
        registry
    }

    /// Adds a site, replacing any existing entry for the same host.
    pub fn register<A: SiteAdapter + 'static>(&mut self, site: A) {
        self.register_arc(Arc::new(site));
    }

    pub fn register_arc(&mut self, site: Arc<dyn SiteAdapter>) {
        let key = site.id().trim_start_matches("www.").to_lowercase();
        if self.sites.insert(key.clone(), site).is_some() {
            tracing::debug!(host = %key, "replaced site descriptor");
        }
    }

    pub fn get(&self, host: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.sites.get(host).cloned()
    }

    /// Finds the site handling `url`, if any.
    pub fn lookup(&self, url: &str) -> Option<Arc<dyn SiteAdapter>> {
        host_key(url).and_then(|host| self.get(&host))
    }

    pub fn is_supported(&self, url: &str) -> bool {
        self.lookup(url).is_some()
    }

    /// Registered hosts, sorted.
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.sites.keys().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

impl std::fmt::Debug for SiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteRegistry").field("hosts", &self.hosts()).finish()
    }
}
