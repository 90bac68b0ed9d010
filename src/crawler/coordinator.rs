//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives the breadth-first crawl loop:
//! - Seeding the frontier with the canonical start URL
//! - Dispatching each depth level as one concurrent fetch batch
//! - Routing results through parser, storage and link extraction
//! - Enforcing the depth and page limits
//!
//! The frontier and storage are only touched after a batch has fully joined,
//! so no locking is needed around them.

use crate::config::{Config, CrawlerConfig, FetcherBackend, ParserKind};
use crate::crawler::fetcher::{FetchError, FetchResult, Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::links::{extract_links, links_from_extra, LinkSource};
use crate::crawler::parser::{HtmlParser, MarkdownParser, Parser};
use crate::crawler::report::CrawlReport;
use crate::crawler::scrape::ScrapeFetcher;
use crate::storage::{SqliteStorage, Storage};
use crate::url::{canonicalize, parse_crawlable, CanonicalUrl};
use crate::DeltaError;
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where the coordinator is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Constructed, `run` not yet called
    Idle,
    /// Frontier holds only the start URL
    Seeded,
    /// Dispatching and processing the batch at the current depth
    FetchingBatch,
    /// No URLs left at the current depth; moving one level deeper
    AdvancingDepth,
    Done,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    max_depth: u32,
    max_pages: usize,
    crawl_delay: Duration,
    fetcher: Arc<dyn Fetcher>,
    parser: Box<dyn Parser>,
    storage: Box<dyn Storage>,
    frontier: Frontier,
    phase: CrawlPhase,
}

impl Coordinator {
    /// Creates a coordinator from already-built collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Traversal limits
    /// * `fetcher` - Fetch backend, shared with the spawned fetch tasks
    /// * `parser` - Page parser
    /// * `storage` - Page store, owned for the duration of the run
    pub fn new(
        config: &CrawlerConfig,
        fetcher: Arc<dyn Fetcher>,
        parser: Box<dyn Parser>,
        storage: Box<dyn Storage>,
    ) -> Self {
        Self {
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            crawl_delay: Duration::try_from_secs_f64(config.crawl_delay).unwrap_or(Duration::ZERO),
            fetcher,
            parser,
            storage,
            frontier: Frontier::new(),
            phase: CrawlPhase::Idle,
        }
    }

    /// Builds every collaborator named by the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(DeltaError)` - The HTTP client could not be built or the
    ///   database could not be opened
    pub fn from_config(config: &Config) -> Result<Self, DeltaError> {
        let fetcher = build_fetcher(config)?;
        let parser = build_parser(config.parser.kind);
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;

        Ok(Self::new(&config.crawler, fetcher, parser, Box::new(storage)))
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Crawls breadth-first from `start_url`
    ///
    /// Stops when nothing is pending within `max_depth`, or once `max_pages`
    /// URLs have been processed. Per-page failures are logged and counted in
    /// the report; only an uncrawlable start URL is an error.
    pub async fn run(&mut self, start_url: &str) -> crate::Result<CrawlReport> {
        let seed = canonicalize(parse_crawlable(start_url)?.as_str());
        tracing::info!(
            "Starting crawl at {} (max depth {}, max pages {})",
            seed,
            self.max_depth,
            self.max_pages
        );

        self.frontier.seed(seed.clone());
        self.phase = CrawlPhase::Seeded;

        let mut report = CrawlReport::new(seed);
        let start_time = Instant::now();
        let mut depth: u32 = 0;

        loop {
            if !self.frontier.has_work(self.max_depth)
                || depth > self.max_depth
                || self.frontier.processed_len() >= self.max_pages
            {
                break;
            }

            self.phase = CrawlPhase::FetchingBatch;
            let mut batch = self.frontier.take_batch(depth);

            if batch.is_empty() {
                self.phase = CrawlPhase::AdvancingDepth;
                depth += 1;
                continue;
            }

            let budget = self.max_pages - self.frontier.processed_len();
            if batch.len() > budget {
                let leftover = batch.split_off(budget);
                tracing::debug!("Page budget defers {} URLs at depth {}", leftover.len(), depth);
                self.frontier.requeue(leftover, depth);
            }

            tracing::info!("Depth {}: fetching {} URLs", depth, batch.len());
            report.deepest_depth = Some(depth);

            let results = self.fetch_batch(&batch).await;

            // Marked before expansion so sibling links cannot requeue the batch
            self.frontier.mark_processed(batch);
            report.pages_processed = self.frontier.processed_len();

            for result in results {
                self.process_result(result, depth, &mut report);
            }

            tracing::info!(
                "Progress: {} processed, {} pending",
                report.pages_processed,
                self.frontier.pending_len()
            );

            if !self.crawl_delay.is_zero() {
                tokio::time::sleep(self.crawl_delay).await;
            }
        }

        self.phase = CrawlPhase::Done;
        report.elapsed = start_time.elapsed();

        tracing::info!(
            "Crawl completed: {} pages processed in {:?}",
            report.pages_processed,
            report.elapsed
        );

        Ok(report)
    }

    /// Fetches a batch concurrently, one task per URL, in batch order
    async fn fetch_batch(&self, batch: &[CanonicalUrl]) -> Vec<FetchResult> {
        let handles: Vec<_> = batch
            .iter()
            .cloned()
            .map(|url| {
                let fetcher = Arc::clone(&self.fetcher);
                tokio::spawn(async move { fetcher.fetch(&url).await })
            })
            .collect();

        batch
            .iter()
            .zip(join_all(handles).await)
            .map(|(url, joined)| match joined {
                Ok(result) => result,
                Err(e) => FetchResult::failed(
                    url.clone(),
                    FetchError::Network(format!("fetch task failed: {}", e)),
                ),
            })
            .collect()
    }

    /// Parses, stores and expands one fetch result
    fn process_result(&mut self, result: FetchResult, depth: u32, report: &mut CrawlReport) {
        if !result.is_success() {
            report.fetch_failures += 1;
            tracing::warn!(
                "Fetch failed for {} (status {}): {}",
                result.url,
                result.status_code,
                result.error.as_deref().unwrap_or("unknown error")
            );
            return;
        }
        report.pages_fetched += 1;

        let assets = match self
            .parser
            .parse(&result.url, &result.content, result.extra.as_ref())
        {
            Ok(assets) => assets,
            Err(e) => {
                report.parse_failures += 1;
                tracing::warn!("Failed to parse {}: {}", result.url, e);
                return;
            }
        };

        match self.storage.upsert_page(&assets) {
            Ok((content_changed, html_changed)) => {
                if content_changed {
                    report.content_changed += 1;
                }
                if html_changed {
                    report.head_changed += 1;
                }
                if content_changed || html_changed {
                    report.pages_changed += 1;
                }
                tracing::info!(
                    "{} {} {}",
                    if content_changed { "EMBD" } else { "----" },
                    if html_changed { "SEO " } else { "----" },
                    result.url
                );
            }
            Err(e) => {
                // Treated as unchanged; links are still followed
                report.storage_failures += 1;
                tracing::warn!("Storage error for {}: {}", result.url, e);
            }
        }

        let child_depth = depth + 1;
        if child_depth > self.max_depth {
            return;
        }

        let backend_links = result.extra.as_ref().and_then(links_from_extra);
        let source = LinkSource {
            html: &result.content,
            discovered_links: backend_links.as_deref(),
        };

        let mut offered = 0;
        for link in extract_links(&result.url, source) {
            if self.frontier.offer(link, child_depth) {
                offered += 1;
            }
        }

        report.links_discovered += offered;
        tracing::debug!("{} new links from {}", offered, result.url);
    }
}

/// Constructs the fetch backend selected by the configuration
pub fn build_fetcher(config: &Config) -> Result<Arc<dyn Fetcher>, reqwest::Error> {
    let concurrency = config.crawler.concurrency;
    Ok(match config.fetcher.backend {
        FetcherBackend::Http => Arc::new(HttpFetcher::new(&config.fetcher, concurrency)?),
        FetcherBackend::Scrape => Arc::new(ScrapeFetcher::new(&config.fetcher, concurrency)?),
    })
}

/// Constructs the parser selected by the configuration
pub fn build_parser(kind: ParserKind) -> Box<dyn Parser> {
    match kind {
        ParserKind::Html => Box::new(HtmlParser),
        ParserKind::Markdown => Box::new(MarkdownParser),
    }
}

/// Runs the main crawl operation
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `start_url` - Where the crawl begins
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(DeltaError)` - Startup failed (client, database or start URL)
///
/// # Example
///
/// ```no_run
/// use delta_crawl::config::Config;
/// use delta_crawl::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(&Config::default(), "https://example.com/").await?;
/// println!("{} pages processed", report.pages_processed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config, start_url: &str) -> Result<CrawlReport, DeltaError> {
    let mut coordinator = Coordinator::from_config(config)?;
    coordinator.run(start_url).await
}
