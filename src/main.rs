//! Shoptrawl main entry point
//!
//! This is the command-line interface for the Shoptrawl storefront crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use shoptrawl::config::{build_profiles, load_config_with_hash, Config, ShopProfile};
use shoptrawl::crawler::{build_http_client, crawl, CrawlReport, HttpFetcher};
use shoptrawl::storage::{open_storage, ProgressStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Shoptrawl: a resumable storefront crawler
///
/// Shoptrawl walks each configured shop from its start URL, extracts product
/// and image records from product pages, and stores each distinct record once.
/// Interrupted crawls resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "shoptrawl")]
#[command(version)]
#[command(about = "A resumable storefront crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Only crawl the shop with this name
    #[arg(long, value_name = "NAME")]
    shop: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Forget each selected shop's progress before crawling (records are kept)
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "resolve_images"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "resolve_images"])]
    stats: bool,

    /// Download the bytes of stored images that have none yet and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    resolve_images: bool,

    /// Maximum number of images to download with --resolve-images
    #[arg(long, value_name = "N", requires = "resolve_images")]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let profiles = build_profiles(&config, cli.shop.as_deref())?;

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, &profiles);
    } else if cli.stats {
        handle_stats(&config, &profiles)?;
    } else if cli.resolve_images {
        handle_resolve_images(&config, cli.limit).await?;
    } else {
        handle_crawl(&config, profiles, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shoptrawl=info,warn"),
            1 => EnvFilter::new("shoptrawl=debug,info"),
            2 => EnvFilter::new("shoptrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, profiles: &[ShopProfile]) {
    println!("=== Shoptrawl Dry Run ===\n");

    println!("Crawler Defaults:");
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Rate limit: {}s", config.crawler.rate_limit_seconds);
    println!("  Timeout: {}s", config.crawler.timeout_seconds);
    println!("  Wait for selector: {}", config.crawler.wait_for_selector);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Blob directory: {}", config.storage.blob_dir);

    println!("\nShops ({}):", profiles.len());
    for profile in profiles {
        println!("  - {} ({})", profile.name(), profile.base_url());
        println!("    Start URL: {}", profile.start_url());
        println!(
            "    Rate limit: {:?}, timeout: {:?}, wait for: {}",
            profile.rate_limit(),
            profile.timeout(),
            profile.wait_for_selector()
        );

        if let Some(shop) = config.shops.iter().find(|s| s.name == profile.name()) {
            println!("    Product pattern: {}", shop.patterns.product);
            println!("    Category pattern: {}", shop.patterns.category);
            println!("    Pagination pattern: {}", shop.patterns.pagination);
        }

        let fields: Vec<&str> = profile.metadata_selectors().keys().map(String::as_str).collect();
        println!("    Metadata fields: {}", fields.join(", "));
        println!("    Image selectors: {}", profile.image_selectors().len());
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling {} shops", profiles.len());
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, profiles: &[ShopProfile]) -> anyhow::Result<()> {
    use shoptrawl::output::{load_statistics, print_statistics};
    use shoptrawl::storage::SqliteStorage;

    println!("Database: {}\n", config.storage.database_path);

    // Open the database
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;

    // Load statistics
    let stats = load_statistics(&storage, profiles)?;

    // Print statistics
    print_statistics(&stats);

    Ok(())
}

/// Handles the --resolve-images mode: downloads pending image bytes
async fn handle_resolve_images(config: &Config, limit: Option<usize>) -> anyhow::Result<()> {
    use shoptrawl::storage::{ImageResolver, LocalBlobStore};

    let mut storage = open_storage(Path::new(&config.storage.database_path))?;
    let client = build_http_client(&config.crawler.user_agent)?;
    let blobs = LocalBlobStore::new(&config.storage.blob_dir);
    let resolver = ImageResolver::new(
        client,
        blobs,
        Duration::from_secs(config.crawler.timeout_seconds),
    );

    tracing::info!("Resolving image bytes into {}", config.storage.blob_dir);
    let summary = resolver.resolve_pending(&mut storage, limit).await?;

    println!(
        "✓ Resolved {} images ({} failed)",
        summary.resolved, summary.failed
    );

    Ok(())
}

/// Handles the main crawl operation
///
/// Every shop is crawled by its own task with its own database connection.
/// Ctrl-C cancels all of them; progress is kept so the next run resumes.
async fn handle_crawl(config: &Config, profiles: Vec<ShopProfile>, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous progress)");
    } else {
        tracing::info!("Starting crawl (will resume if interrupted run exists)");
    }
    tracing::info!("Shops to crawl: {}", profiles.len());

    let database = PathBuf::from(&config.storage.database_path);
    let client = build_http_client(&config.crawler.user_agent)?;
    let cancel = CancellationToken::new();

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            interrupt.cancel();
        }
    });

    let mut handles = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let name = profile.name().to_string();

        let mut storage = open_storage(&database)
            .with_context(|| format!("Failed to open storage for {}", name))?;
        if fresh {
            storage.reset(profile.base_url())?;
        }

        let fetcher = HttpFetcher::new(client.clone());
        let shop_crawl = crawl(profile, fetcher, storage, cancel.child_token())
            .with_context(|| format!("Failed to start crawl of {}", name))?;

        handles.push((name, tokio::spawn(shop_crawl.run())));
    }

    let mut reports: Vec<CrawlReport> = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.await {
            Ok(report) => reports.push(report),
            Err(e) => tracing::error!("Crawl of {} panicked: {}", name, e),
        }
    }

    shoptrawl::output::print_crawl_summary(&reports);
    tracing::info!("Crawl completed");

    Ok(())
}
