//! delta-crawl main entry point
//!
//! This is the command-line interface for the delta-crawl incremental crawler.

use anyhow::Context;
use clap::Parser;
use delta_crawl::config::{load_config_with_hash, validate, Config};
use delta_crawl::crawler::Coordinator;
use delta_crawl::output::{load_statistics, print_pending_embeddings, print_report, print_statistics};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// delta-crawl: An incremental website crawler
///
/// delta-crawl walks a single site breadth-first, stores a checksum of every
/// page's main text and SEO head, and records which pages changed since the
/// previous run so only those need re-embedding.
#[derive(Parser, Debug)]
#[command(name = "delta-crawl")]
#[command(version)]
#[command(about = "An incremental website crawler with change detection", long_about = None)]
struct Cli {
    /// URL the crawl starts from
    #[arg(value_name = "START_URL")]
    start_url: String,

    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the maximum link depth
    #[arg(long)]
    max_depth: Option<u32>,

    /// Override the maximum number of pages to process
    #[arg(long)]
    max_pages: Option<usize>,

    /// Override the delay between batches, in seconds
    #[arg(long)]
    crawl_delay: Option<f64>,

    /// Override the number of concurrent fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// List pages waiting for an embedding pass after the crawl
    #[arg(long)]
    pending_embeddings: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load_effective_config(&cli)?;

    let mut coordinator =
        Coordinator::from_config(&config).context("Failed to initialize crawler")?;

    let report = coordinator
        .run(&cli.start_url)
        .await
        .with_context(|| format!("Crawl from {} failed", cli.start_url))?;

    if !cli.quiet {
        print_report(&report);
        println!();

        let stats = load_statistics(coordinator.storage()).context("Failed to load statistics")?;
        print_statistics(&stats);

        if cli.pending_embeddings {
            println!();
            print_pending_embeddings(coordinator.storage())
                .context("Failed to list pending embeddings")?;
        }
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
            0 => EnvFilter::new("delta_crawl=info,warn"),
            1 => EnvFilter::new("delta_crawl=debug,info"),
            2 => EnvFilter::new("delta_crawl=trace,debug"),
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

/// Loads the configuration file (if any), applies command-line overrides,
/// and validates the result
fn load_effective_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
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

    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(crawl_delay) = cli.crawl_delay {
        config.crawler.crawl_delay = crawl_delay;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}
