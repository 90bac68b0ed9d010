//! Scraping-service fetch backend
//!
//! Posts each URL to `{endpoint}/scrape` and receives rendered HTML,
//! markdown, the page's link list and page metadata in a single response.

use crate::config::FetcherConfig;
use crate::crawler::fetcher::{build_http_client, Extra, FetchError, FetchResult, Fetcher};
use crate::url::CanonicalUrl;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScrapeData {
    html: Option<String>,
    markdown: Option<String>,
    /// Absent or null when the service did not collect links
    links: Option<Vec<String>>,
    metadata: Option<Value>,
}

/// Fetcher backed by a remote scraping service
pub struct ScrapeFetcher {
    client: Client,
    scrape_url: String,
    request_timeout_ms: u64,
    max_retries: u32,
    retry_backoff: Duration,
    rate_limit: Duration,
    permits: Arc<Semaphore>,
    last_request: Mutex<Option<Instant>>,
}

impl ScrapeFetcher {
    /// Creates a scrape fetcher admitting at most `concurrency` requests at once
    ///
    /// # Arguments
    ///
    /// * `config` - Fetcher configuration (endpoint, retries, rate limit)
    /// * `concurrency` - Number of in-flight scrape requests allowed
    pub fn new(config: &FetcherConfig, concurrency: usize) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            scrape_url: format!("{}/scrape", config.scrape_endpoint.trim_end_matches('/')),
            request_timeout_ms: config.timeout_secs.saturating_mul(1000),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            last_request: Mutex::new(None),
        })
    }

    /// Waits until at least `rate_limit` has passed since the previous request
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let next_allowed = previous + self.rate_limit;
            if next_allowed > Instant::now() {
                tokio::time::sleep_until(next_allowed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn scrape_once(&self, url: &CanonicalUrl) -> Result<ScrapeData, FetchError> {
        self.throttle().await;

        let body = json!({
            "url": url.as_str(),
            "formats": ["html", "markdown", "links"],
            "onlyMainContent": false,
            "timeout": self.request_timeout_ms,
        });

        let response = self.client.post(&self.scrape_url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FetchError::Service(format!("HTTP {}: {}", status.as_u16(), text.trim())));
        }

        let parsed: ScrapeResponse = response.json().await?;

        if !parsed.success {
            return Err(FetchError::Service(
                parsed.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(parsed.data.unwrap_or_default())
    }

    /// Runs up to `1 + max_retries` attempts with exponential backoff
    async fn scrape(&self, url: &CanonicalUrl) -> Result<ScrapeData, FetchError> {
        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Closed)?;

        let mut attempt: u32 = 0;
        loop {
            match self.scrape_once(url).await {
                Ok(data) => return Ok(data),
                Err(e) if attempt < self.max_retries => {
                    let delay = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::warn!(
                        "Scrape attempt {} failed for {}: {} (retrying in {:?})",
                        attempt + 1,
                        url,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Fetcher for ScrapeFetcher {
    async fn fetch(&self, url: &CanonicalUrl) -> FetchResult {
        match self.scrape(url).await {
            Ok(data) => {
                let mut extra = Extra::new();
                extra.insert(
                    "markdown".to_string(),
                    Value::String(data.markdown.unwrap_or_default()),
                );
                if let Some(links) = data.links {
                    extra.insert(
                        "links".to_string(),
                        Value::Array(links.into_iter().map(Value::String).collect()),
                    );
                }
                extra.insert(
                    "metadata".to_string(),
                    data.metadata.unwrap_or_else(|| Value::Object(Extra::new())),
                );

                FetchResult::ok(
                    url.clone(),
                    data.html.unwrap_or_default(),
                    Some("text/html".to_string()),
                )
                .with_extra(extra)
            }
            Err(e) => {
                tracing::warn!("Scrape failed for {}: {}", url, e);
                FetchResult::failed(url.clone(), e)
            }
        }
    }
}
