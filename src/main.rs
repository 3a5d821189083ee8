//! Judgment-Harvest main entry point
//!
//! This is the command-line interface for the Judgment-Harvest catalog harvester.

use anyhow::Context;
use clap::Parser;
use judgment_harvest::config::{load_config_with_hash, validate, Config};
use judgment_harvest::crawler::{Coordinator, ListingFetcher};
use judgment_harvest::output::{load_failed_ids, print_summary, write_failed_ids, CrawlSummary};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

/// Judgment-Harvest: a paced, concurrent catalog harvester
///
/// Walks numbered listing pages in order, downloads every linked document
/// in parallel per page, and stores each one exactly once.
#[derive(Parser, Debug)]
#[command(name = "judgment-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A paced, concurrent catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the first listing page
    #[arg(long, value_name = "N")]
    start_page: Option<u32>,

    /// Override the last listing page
    #[arg(long, value_name = "N")]
    end_page: Option<u32>,

    /// Validate config and show what would be harvested without any network access
    #[arg(long, conflicts_with = "retry_failed")]
    dry_run: bool,

    /// Download only the identifiers listed in FILE (one per line)
    #[arg(long, value_name = "FILE")]
    retry_failed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(start) = cli.start_page {
        config.crawler.start_page = start;
    }
    if let Some(end) = cli.end_page {
        config.crawler.end_page = end;
    }
    validate(&config).context("invalid page range override")?;

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    let failed_ids_path = config.output.failed_ids_path.clone();
    let coordinator = Coordinator::new(config)?;

    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, finishing the current page");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    let summary = match cli.retry_failed {
        Some(path) => handle_retry(&coordinator, &path).await?,
        None => coordinator.run().await,
    };

    print_summary(&summary);

    if let Some(path) = failed_ids_path {
        write_failed_ids(&summary, &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(
            "Wrote {} failed identifiers to {}",
            summary.total_failed(),
            path.display()
        );
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("judgment_harvest=info,warn"),
            1 => EnvFilter::new("judgment_harvest=debug,info"),
            2 => EnvFilter::new("judgment_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be harvested
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let listing = ListingFetcher::new(&config.site)?;

    println!("=== Judgment-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!(
        "  First listing URL: {}",
        listing.page_url(config.crawler.start_page)
    );
    println!(
        "  Document links: /{}/{{id}}",
        config.site.document_path.trim_matches('/')
    );

    println!("\nCrawler:");
    println!(
        "  Pages: {}..={}",
        config.crawler.start_page, config.crawler.end_page
    );
    println!("  Delay between pages: {}ms", config.crawler.page_delay_ms);
    println!(
        "  Parallel downloads: {}",
        config.crawler.max_concurrent_downloads
    );
    match config.crawler.stop_after_empty_pages {
        Some(n) => println!("  Stop after {} consecutive empty pages", n),
        None => println!("  Scan the full range"),
    }

    println!("\nTransport:");
    println!("  User agent: {}", config.user_agent.header_value());
    println!("  Timeout: {}s", config.transport.timeout_secs);
    println!(
        "  Retries: {} (backoff base {}ms)",
        config.transport.retries, config.transport.backoff_base_ms
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory.display());
    println!("  Minimum document size: {} bytes", config.output.min_document_bytes);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --retry-failed mode: downloads a list of identifiers
async fn handle_retry(
    coordinator: &Coordinator,
    path: &std::path::Path,
) -> anyhow::Result<CrawlSummary> {
    let ids = load_failed_ids(path)
        .with_context(|| format!("failed to read identifiers from {}", path.display()))?;
    tracing::info!("Loaded {} identifiers from {}", ids.len(), path.display());
    Ok(coordinator.retry_ids(&ids).await)
}
