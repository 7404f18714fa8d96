//! Sitewalk main entry point
//!
//! This is the command-line interface for the Sitewalk site crawler.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sitewalk::config::{load_config_with_hash, Config};
use sitewalk::output::{generate_markdown_summary, print_statistics, CrawlStatistics};
use sitewalk::Crawler;
use tracing_subscriber::EnvFilter;

/// Sitewalk: a single-domain breadth-first site crawler
///
/// Sitewalk enumerates the pages reachable on one host, recording each
/// page's title and link health, and retries failed pages before reporting
/// the ones that never recovered.
#[derive(Parser, Debug)]
#[command(name = "sitewalk")]
#[command(version = "1.0.0")]
#[command(about = "A single-domain breadth-first site crawler", long_about = None)]
struct Cli {
    /// Domain or root URL to crawl (https:// is assumed)
    #[arg(value_name = "DOMAIN")]
    domain: String,

    /// Maximum number of pages to record (defaults to the config value)
    #[arg(short = 'n', long, value_name = "N")]
    max_pages: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write a markdown crawl summary to this file
    #[arg(short, long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let max_pages = cli.max_pages.unwrap_or(config.crawler.max_pages);
    let crawler = Crawler::new(config).context("Failed to initialize crawler")?;

    let handle = crawler
        .start_with_progress(&cli.domain, max_pages, |progress| {
            tracing::info!(
                "Progress: {} pages found, {} queued, {} errors",
                progress.pages_found,
                progress.pages_queued,
                progress.errors
            );
        })
        .with_context(|| format!("Failed to start crawl of '{}'", cli.domain))?;

    // Ctrl-C requests a cooperative stop; in-flight fetches still finish
    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            stopper.stop();
        }
    });

    let report = handle.wait().await;

    if !cli.quiet {
        print_statistics(&CrawlStatistics::from_report(&report));
    }

    if let Some(path) = &cli.summary {
        generate_markdown_summary(&report, path)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        tracing::info!("Summary written to {}", path.display());
    }

    for entry in &report.error_summary {
        tracing::warn!(
            "Unresolved: {} ({}, {} retries)",
            entry.url,
            entry.error,
            entry.retry_count
        );
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
            0 => EnvFilter::new("sitewalk=info,warn"),
            1 => EnvFilter::new("sitewalk=debug,info"),
            2 => EnvFilter::new("sitewalk=trace,debug"),
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
