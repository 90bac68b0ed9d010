//! Fetch backends
//!
//! This module defines the [`Fetcher`] seam the orchestrator dispatches
//! through, and the direct HTTP implementation:
//! - Building HTTP clients with the configured user agent and timeouts
//! - Admission control via a semaphore of `concurrency` permits
//! - Error classification (timeouts, connection failures, HTTP status,
//!   non-HTML content)
//!
//! Fetchers never return `Err`: every failure is folded into the
//! [`FetchResult`] so the orchestrator can mark the URL processed and move on.

use crate::config::FetcherConfig;
use crate::url::CanonicalUrl;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Backend-specific payload attached to a fetch (markdown, links, metadata)
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Maximum redirect hops followed by the HTTP fetcher
const MAX_REDIRECTS: usize = 10;

/// Reasons a fetch can fail
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Expected HTML, got {0}")]
    NotHtml(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Scrape service error: {0}")]
    Service(String),

    #[error("Fetcher is shut down")]
    Closed,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: CanonicalUrl,
    /// Page body (HTML); empty on failure
    pub content: String,
    /// HTTP status code (500 for transport failures)
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Failure description, `None` on success
    pub error: Option<String>,
    /// Backend payload: `markdown`, `links`, `metadata` for the scrape backend
    pub extra: Option<Extra>,
}

impl FetchResult {
    /// Creates a successful result
    pub fn ok(url: CanonicalUrl, content: String, content_type: Option<String>) -> Self {
        Self {
            url,
            content,
            status_code: 200,
            content_type,
            error: None,
            extra: None,
        }
    }

    /// Creates a failed result
    ///
    /// HTTP status failures keep their code; every other failure reports 500.
    pub fn failed(url: CanonicalUrl, error: FetchError) -> Self {
        let status_code = match error {
            FetchError::Status(code) => code,
            _ => 500,
        };

        Self {
            url,
            content: String::new(),
            status_code,
            content_type: None,
            error: Some(error.to_string()),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Returns true when the fetch produced a page to parse
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status_code)
    }
}

/// A source of page content
///
/// Implementations own their admission control: the orchestrator spawns one
/// task per URL in a batch and relies on the fetcher to bound how many run at
/// once.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &CanonicalUrl) -> FetchResult;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use delta_crawl::config::FetcherConfig;
/// use delta_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Direct HTTP GET fetcher
pub struct HttpFetcher {
    client: Client,
    permits: Arc<Semaphore>,
}

impl HttpFetcher {
    /// Creates a fetcher admitting at most `concurrency` requests at once
    pub fn new(config: &FetcherConfig, concurrency: usize) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        })
    }

    async fn get(&self, url: &CanonicalUrl) -> Result<(String, Option<String>), FetchError> {
        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Closed)?;

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        if let Some(ct) = &content_type {
            if !is_html_content_type(ct) {
                return Err(FetchError::NotHtml(ct.clone()));
            }
        }

        let body = response.text().await?;
        Ok((body, content_type))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &CanonicalUrl) -> FetchResult {
        match self.get(url).await {
            Ok((body, content_type)) => FetchResult::ok(url.clone(), body, content_type),
            Err(e) => {
                tracing::debug!("Fetch failed for {}: {}", url, e);
                FetchResult::failed(url.clone(), e)
            }
        }
    }
}

/// A missing Content-Type is accepted; an explicit non-HTML one is not
fn is_html_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("text/html") || ct.contains("application/xhtml+xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::canonicalize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&FetcherConfig::default()).is_ok());
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("text/html; charset=UTF-8"));
        assert!(is_html_content_type("Application/XHTML+XML"));
        assert!(!is_html_content_type("application/pdf"));
        assert!(!is_html_content_type("image/png"));
    }

    #[test]
    fn test_failed_result_status() {
        let url = canonicalize("https://example.com/");
        let r = FetchResult::failed(url.clone(), FetchError::Status(404));
        assert_eq!(r.status_code, 404);
        assert!(!r.is_success());

        let r = FetchResult::failed(url, FetchError::Timeout);
        assert_eq!(r.status_code, 500);
        assert_eq!(r.error.as_deref(), Some("Request timeout"));
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>hi</body></html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetcherConfig::default(), 2).unwrap();
        let url = canonicalize(&format!("{}/page", server.uri()));
        let result = fetcher.fetch(&url).await;

        assert!(result.is_success());
        assert_eq!(result.content, "<html><body>hi</body></html>");
        assert_eq!(result.url, url);
    }

    #[tokio::test]
    async fn test_fetch_404_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetcherConfig::default(), 2).unwrap();
        let url = canonicalize(&format!("{}/missing", server.uri()));
        let result = fetcher.fetch(&url).await;

        assert!(!result.is_success());
        assert_eq!(result.status_code, 404);
        assert_eq!(result.error.as_deref(), Some("HTTP 404"));
    }

    #[tokio::test]
    async fn test_fetch_non_html_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&FetcherConfig::default(), 2).unwrap();
        let url = canonicalize(&format!("{}/doc.pdf", server.uri()));
        let result = fetcher.fetch(&url).await;

        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("application/pdf"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let mut config = FetcherConfig::default();
        config.connect_timeout_secs = 1;
        config.timeout_secs = 2;
        let fetcher = HttpFetcher::new(&config, 1).unwrap();

        // Port 9 (discard) is not listening in test environments
        let url = canonicalize("http://127.0.0.1:9/");
        let result = fetcher.fetch(&url).await;

        assert!(!result.is_success());
        assert_eq!(result.status_code, 500);
    }
}
