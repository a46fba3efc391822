use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use unpage_core::{
    ConfigLoader, ConfigLoaderBuilder, FetchConfig, HttpFetcher, Paginator, SessionConfig, SessionOutcome,
    SiteRegistry, StaticDocument, UnpageError, fetch_file, fetch_stdin, fetch_url,
};

mod echo;

use echo::{CliReporter, format_size, print_banner, print_error, print_info, print_step, print_success};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What to print once every page is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    /// The live page with the article replaced
    Html,
    /// Only the assembled article container
    Article,
    /// Session summary with the assembled markup
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "article" => Ok(Self::Article),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: html, article, json", s)),
        }
    }
}

/// Load every page of a paginated article into one document
#[derive(Parser, Debug)]
#[command(name = "unpage")]
#[command(author = "Unpage Contributors")]
#[command(version)]
#[command(about = "Load every page of a paginated article into one document", long_about = None)]
struct Args {
    /// URL of any page of the article
    #[arg(value_name = "URL")]
    url: String,

    /// Saved copy of the live page, or "-" for stdin (default: fetch URL)
    #[arg(long, value_name = "FILE")]
    page: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (html, article, json)
    #[arg(short, long, default_value = "html", value_name = "FORMAT")]
    format: OutputFormat,

    /// Give up after this many pages
    #[arg(long, default_value = "50", value_name = "NUM")]
    max_pages: u32,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Limit for the whole session in seconds (0 disables it)
    #[arg(long, default_value = "300", value_name = "SECS")]
    session_timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Custom site descriptor directory
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "unpage_core=debug" } else { "unpage_core=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn site_registry(config_dir: Option<PathBuf>) -> anyhow::Result<(ConfigLoader, SiteRegistry)> {
    let mut builder = ConfigLoaderBuilder::new();
    if let Some(dir) = config_dir.or_else(ConfigLoader::default_custom_dir) {
        builder = builder.custom_dir(dir);
    }
    if let Some(dir) = ConfigLoader::default_standard_dir() {
        builder = builder.standard_dir(dir);
    }

    let mut loader = builder.build();
    let mut registry = SiteRegistry::builtin();
    let loaded = loader
        .register_all(&mut registry)
        .context("Failed to load site descriptors")?;
    tracing::debug!(loaded, sites = registry.len(), "site registry ready");

    Ok((loader, registry))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.verbose {
        print_banner();
    }

    let (mut loader, registry) = site_registry(args.config_dir.clone())?;
    let found = loader
        .lookup(&registry, &args.url)
        .context("Failed to load site descriptor")?;
    let Some(site) = found else {
        let err = UnpageError::UnsupportedSite(args.url.clone());
        print_error(err.user_message());
        return Err(err.into());
    };

    // Nothing is read or fetched for a URL the site can't paginate.
    if let Err(err) = site.compute_template(&args.url) {
        print_error(err.user_message());
        return Err(err.into());
    }

    if args.verbose {
        print_step(1, 3, &format!("Matched site {}", site.id().bright_white()));
    }

    let fetch_config = FetchConfig {
        timeout: args.timeout,
        user_agent: args.user_agent.clone().unwrap_or_else(|| FetchConfig::default().user_agent),
        ..Default::default()
    };
    let session_config = SessionConfig::builder()
        .max_pages(args.max_pages)
        .session_timeout((args.session_timeout > 0).then(|| Duration::from_secs(args.session_timeout)))
        .build();

    let fetcher = Arc::new(HttpFetcher::new(fetch_config.clone()).context("Failed to build HTTP client")?);
    let paginator = Paginator::new(fetcher, session_config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let output = match args.format {
        OutputFormat::Html => {
            let live = match args.page.as_deref() {
                Some("-") => fetch_stdin().context("Failed to read from stdin")?,
                Some(path) => fetch_file(path).with_context(|| format!("Failed to read file: {}", path))?,
                None => fetch_url(&args.url, &fetch_config)
                    .await
                    .context("Failed to fetch live page")?,
            };

            if args.verbose {
                print_step(2, 3, "Loading all pages");
                eprintln!("  {} {}", "Live page:".dimmed(), format_size(live.len()).bright_white());
            }

            let mut doc = StaticDocument::new(live);
            let reporter = CliReporter { verbose: args.verbose };
            let outcome = paginator
                .run_session(&args.url, site.as_ref(), &mut doc, &reporter, &cancel)
                .await;

            let message = outcome.message();
            if let SessionOutcome::Failed { reason } = outcome {
                print_error(&message);
                return Err(anyhow::Error::new(reason).context("Pagination failed"));
            }
            print_success(&message);
            doc.into_html()
        }
        OutputFormat::Article | OutputFormat::Json => {
            if args.verbose {
                print_step(2, 3, "Loading all pages");
            }

            let assembly = match paginator.collect(&args.url, site.as_ref(), &cancel).await {
                Ok(assembly) => assembly,
                Err(reason) => {
                    print_error(reason.user_message());
                    return Err(anyhow::Error::new(reason).context("Pagination failed"));
                }
            };
            match assembly.pages_loaded {
                1 => print_success("Loaded 1 page"),
                n => print_success(&format!("Loaded {} pages", n)),
            }

            if args.format == OutputFormat::Json {
                serde_json::to_string_pretty(&assembly).context("Failed to serialize session summary")?
            } else {
                assembly.markup
            }
        }
    };

    if args.verbose {
        print_step(3, 3, "Writing output");
        print_info(&format!("{} of {:?}", format_size(output.len()), args.format));
    }

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}
