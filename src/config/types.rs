use serde::Deserialize;

/// Main configuration structure for Delta-Crawl
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// usable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetcher: FetcherConfig,
    pub parser: ParserConfig,
    pub storage: StorageConfig,
}

/// Crawl traversal limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link depth from the start URL (start URL is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of pages processed in one run
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Pause after each batch, in seconds
    #[serde(rename = "crawl-delay")]
    pub crawl_delay: f64,

    /// Number of fetches admitted at once
    pub concurrency: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 1000,
            crawl_delay: 0.2,
            concurrency: 8,
        }
    }
}

/// Which fetch backend to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherBackend {
    /// Direct HTTP GET with reqwest
    #[default]
    Http,
    /// Remote scraping service returning html, markdown and links
    Scrape,
}

/// Fetch backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub backend: FetcherBackend,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Base URL of the scraping service (`/scrape` is appended)
    #[serde(rename = "scrape-endpoint")]
    pub scrape_endpoint: String,

    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Minimum interval between requests to the scraping service
    #[serde(rename = "rate-limit-ms")]
    pub rate_limit_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backend: FetcherBackend::Http,
            user_agent: format!("DeltaCrawl/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            scrape_endpoint: "http://localhost:3002/v1".to_string(),
            max_retries: 3,
            retry_backoff_ms: 1000,
            rate_limit_ms: 200,
        }
    }
}

/// Which parser to construct at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    #[default]
    Html,
    Markdown,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub kind: ParserKind,
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "delta-crawl.db".to_string(),
        }
    }
}
