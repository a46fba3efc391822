use crate::error::{Result, UnpageError};
use crate::siteconfig::directives::SiteConfig;
use crate::siteconfig::parser::ConfigParser;
use crate::sites::{SiteAdapter, SiteDescriptor, SiteRegistry, host_key};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loader for site descriptor files
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Custom descriptor directory path
    custom_dir: Option<PathBuf>,
    /// Standard descriptor directory path
    standard_dir: Option<PathBuf>,
    /// Descriptors by host; `None` records a host with no file
    cache: HashMap<String, Option<SiteDescriptor>>,
}

impl ConfigLoader {
    /// Create a loader with no search directories
    pub fn new() -> Self {
        Self { custom_dir: None, standard_dir: None, cache: HashMap::new() }
    }

    /// Load the descriptor for an article URL
    pub fn load_for_url(&mut self, url: &str) -> Result<Option<SiteDescriptor>> {
        let host = host_key(url).ok_or_else(|| UnpageError::InvalidUrl(url.to_string()))?;
        self.load_for_domain(&host)
    }

    /// Load the descriptor for a host, `None` when no file covers it
    pub fn load_for_domain(&mut self, domain: &str) -> Result<Option<SiteDescriptor>> {
        let domain = domain.trim().to_lowercase();
        let domain = domain.strip_prefix("www.").unwrap_or(&domain).to_string();

        if let Some(cached) = self.cache.get(&domain) {
            return Ok(cached.clone());
        }

        let config = self.load_config(&domain)?;
        let descriptor = if config.is_empty() { None } else { Some(config.to_descriptor(&domain)?) };

        if let Some(site) = &descriptor {
            tracing::debug!(host = %domain, rules = site.rules.len(), "loaded site descriptor");
        }
        self.cache.insert(domain, descriptor.clone());

        Ok(descriptor)
    }

    /// Merge every descriptor file that applies to `domain`, highest priority first
    pub fn load_config(&self, domain: &str) -> Result<SiteConfig> {
        let mut merged = SiteConfig::new();

        for file_path in self.find_config_files(domain) {
            match ConfigParser::parse_file(&file_path) {
                Ok(config) => merged.merge(&config),
                Err(e) => tracing::warn!(path = %file_path.display(), "skipping descriptor file: {}", e),
            }
        }

        Ok(merged)
    }

    /// Register every descriptor found in the search directories.
    ///
    /// Files are keyed by their `host` directive, or the file name without
    /// `.txt` and any leading dot. Built-in sites already in the registry
    /// are overridden. Returns how many descriptors were registered.
    pub fn register_all(&mut self, registry: &mut SiteRegistry) -> Result<usize> {
        let mut hosts = Vec::new();
        for dir in [&self.custom_dir, &self.standard_dir].into_iter().flatten() {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    let host = stem.trim_start_matches('.').to_lowercase();
                    if !host.is_empty() && !hosts.contains(&host) {
                        hosts.push(host);
                    }
                }
            }
        }

        let mut registered = 0;
        for host in hosts {
            match self.load_for_domain(&host) {
                Ok(Some(site)) => {
                    registry.register(site);
                    registered += 1;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(host = %host, "invalid site descriptor: {}", e),
            }
        }

        Ok(registered)
    }

    /// Find the site handling `url`: the registry first, then descriptor files.
    ///
    /// The registry only matches exact hosts, so this is how a parent-domain
    /// file such as `.example.org.txt` reaches `news.example.org`.
    pub fn lookup(&mut self, registry: &SiteRegistry, url: &str) -> Result<Option<Arc<dyn SiteAdapter>>> {
        if let Some(site) = registry.lookup(url) {
            return Ok(Some(site));
        }
        let Some(host) = host_key(url) else {
            return Ok(None);
        };

        let site = self.load_for_domain(&host)?;
        Ok(site.map(|site| Arc::new(site) as Arc<dyn SiteAdapter>))
    }

    /// Find all descriptor files for a domain in priority order
    fn find_config_files(&self, domain: &str) -> Vec<PathBuf> {
        let names = generate_config_names(domain);
        let mut files = Vec::new();

        for dir in [&self.custom_dir, &self.standard_dir].into_iter().flatten() {
            for name in &names {
                let file_path = dir.join(name);
                if file_path.is_file() && !files.contains(&file_path) {
                    files.push(file_path);
                }
            }
        }

        files
    }

    /// Clear the descriptor cache
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Candidate file names for a host, most specific first
fn generate_config_names(domain: &str) -> Vec<String> {
    let mut names = vec![format!("{}.txt", domain), format!(".{}.txt", domain)];

    let parts: Vec<&str> = domain.split('.').collect();
    for i in 1..parts.len().saturating_sub(1) {
        let parent = parts[i..].join(".");
        names.push(format!(".{}.txt", parent));
    }

    names
}

/// Builder for ConfigLoader
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    custom_dir: Option<PathBuf>,
    standard_dir: Option<PathBuf>,
}

impl ConfigLoaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom descriptor directory
    pub fn custom_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.custom_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set standard descriptor directory
    pub fn standard_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.standard_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> ConfigLoader {
        ConfigLoader { custom_dir: self.custom_dir, standard_dir: self.standard_dir, cache: HashMap::new() }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        let mut builder = ConfigLoaderBuilder::new();

        if let Some(custom_dir) = Self::default_custom_dir() {
            builder = builder.custom_dir(custom_dir);
        }

        if let Some(standard_dir) = Self::default_standard_dir() {
            builder = builder.standard_dir(standard_dir);
        }

        builder.build()
    }
}

impl ConfigLoader {
    /// Default custom directory (~/.config/unpage/sites)
    pub fn default_custom_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("unpage").join("sites"))
    }

    /// Default standard directory (./site_configs), when present
    pub fn default_standard_dir() -> Option<PathBuf> {
        let std_dir = PathBuf::from("site_configs");
        if std_dir.is_dir() { Some(std_dir) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;
    use crate::rewrite::UrlRule;
    use crate::sites::SiteAdapter;
    use std::fs;
    use tempfile::TempDir;

    const GALLERY: &str = "content: .gallery\nnext_link: a.next\nend_href: /end\n";

    #[test]
    fn test_generate_config_names() {
        let names = generate_config_names("example.com");
        assert_eq!(names, vec!["example.com.txt".to_string(), ".example.com.txt".to_string()]);

        let names = generate_config_names("news.bbc.co.uk");
        assert!(names.contains(&"news.bbc.co.uk.txt".to_string()));
        assert!(names.contains(&".bbc.co.uk.txt".to_string()));
        assert!(names.contains(&".co.uk.txt".to_string()));
        assert!(!names.iter().any(|n| n == ".uk.txt"));
    }

    #[test]
    fn test_config_loader_builder() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().join("custom");
        let standard_path = temp_dir.path().join("standard");

        let loader = ConfigLoaderBuilder::new()
            .custom_dir(&custom_path)
            .standard_dir(&standard_path)
            .build();

        assert_eq!(loader.custom_dir, Some(custom_path));
        assert_eq!(loader.standard_dir, Some(standard_path));
    }

    #[test]
    fn test_load_for_url() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("example.com.txt"), GALLERY).unwrap();

        let mut loader = ConfigLoaderBuilder::new().standard_dir(temp_dir.path()).build();

        let site = loader.load_for_url("http://www.example.com/a/title").unwrap().unwrap();
        assert_eq!(site.id(), "example.com");
        assert_eq!(site.content_selector(), ".gallery");
        assert_eq!(site.url_rule, UrlRule::knowable_style());

        assert!(loader.load_for_domain("other.org").unwrap().is_none());
    }

    #[test]
    fn test_custom_dir_overrides_standard() {
        let temp_dir = TempDir::new().unwrap();
        let custom = temp_dir.path().join("custom");
        let standard = temp_dir.path().join("standard");
        fs::create_dir_all(&custom).unwrap();
        fs::create_dir_all(&standard).unwrap();

        fs::write(custom.join("example.com.txt"), "content: #mine\n").unwrap();
        fs::write(standard.join("example.com.txt"), GALLERY).unwrap();

        let mut loader = ConfigLoaderBuilder::new().custom_dir(&custom).standard_dir(&standard).build();
        let site = loader.load_for_domain("example.com").unwrap().unwrap();

        assert_eq!(site.content_selector, "#mine");
        assert!(site.last_page.is_last_page(&Document::parse("")).unwrap());
    }

    #[test]
    fn test_wildcard_file_covers_subdomains() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".example.com.txt"), GALLERY).unwrap();

        let mut loader = ConfigLoaderBuilder::new().standard_dir(temp_dir.path()).build();
        let site = loader.load_for_domain("news.example.com").unwrap().unwrap();
        assert_eq!(site.id, "news.example.com");
    }

    #[test]
    fn test_cache_survives_file_removal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("example.com.txt");
        fs::write(&path, GALLERY).unwrap();

        let mut loader = ConfigLoaderBuilder::new().standard_dir(temp_dir.path()).build();
        assert!(loader.load_for_domain("example.com").unwrap().is_some());

        fs::remove_file(&path).unwrap();
        assert!(loader.load_for_domain("example.com").unwrap().is_some());

        loader.clear_cache();
        assert!(loader.load_for_domain("example.com").unwrap().is_none());
    }

    #[test]
    fn test_register_all() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("example.com.txt"), GALLERY).unwrap();
        fs::write(temp_dir.path().join("broken.org.txt"), "content: .x\nlast_page: sometimes\n").unwrap();
        fs::write(temp_dir.path().join("notes.md"), "ignored").unwrap();

        let mut loader = ConfigLoaderBuilder::new().standard_dir(temp_dir.path()).build();
        let mut registry = SiteRegistry::new();

        assert_eq!(loader.register_all(&mut registry).unwrap(), 1);
        assert!(registry.is_supported("https://example.com/a/title"));
        assert!(!registry.is_supported("https://broken.org/a/title"));
    }

    #[test]
    fn test_lookup_falls_back_to_parent_domain_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".example.org.txt"), GALLERY).unwrap();

        let mut loader = ConfigLoaderBuilder::new().standard_dir(temp_dir.path()).build();
        let mut registry = SiteRegistry::builtin();
        loader.register_all(&mut registry).unwrap();

        assert!(!registry.is_supported("http://news.example.org/a/title"));

        let site = loader
            .lookup(&registry, "http://news.example.org/a/title")
            .unwrap()
            .unwrap();
        assert_eq!(site.id(), "news.example.org");
        assert_eq!(site.content_selector(), ".gallery");

        let builtin = loader.lookup(&registry, "http://www.knowable.com/a/title").unwrap().unwrap();
        assert_eq!(builtin.id(), "knowable.com");

        assert!(loader.lookup(&registry, "http://other.org/a/title").unwrap().is_none());
        assert!(loader.lookup(&registry, "/a/title").unwrap().is_none());
    }

    #[test]
    fn test_invalid_url() {
        let mut loader = ConfigLoader::new();
        assert!(matches!(loader.load_for_url("/a/title"), Err(UnpageError::InvalidUrl(_))));
    }
}
