//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Fetch backends (direct HTTP and a scraping service)
//! - Page parsers producing clean text for change detection
//! - Same-site link extraction
//! - The breadth-first frontier
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod links;
mod parser;
mod report;
mod scrape;

pub use coordinator::{build_fetcher, build_parser, run_crawl, Coordinator, CrawlPhase};
pub use fetcher::{build_http_client, Extra, FetchError, FetchResult, Fetcher, HttpFetcher};
pub use frontier::{Frontier, FrontierEntry};
pub use links::{extract_links, links_from_extra, LinkSource};
pub use parser::{HtmlParser, MarkdownParser, PageAssets, ParseError, Parser};
pub use report::CrawlReport;
pub use scrape::ScrapeFetcher;
