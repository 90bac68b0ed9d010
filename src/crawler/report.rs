//! Crawl run summary

use crate::url::CanonicalUrl;
use std::time::Duration;

/// Counters collected over one crawl run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Canonical start URL
    pub start_url: Option<CanonicalUrl>,
    /// URLs that completed a fetch attempt (success or failure)
    pub pages_processed: usize,
    /// Successful fetches
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub parse_failures: usize,
    pub storage_failures: usize,
    /// Pages whose content checksum changed (includes new pages)
    pub content_changed: usize,
    /// Pages whose head checksum changed (includes new pages)
    pub head_changed: usize,
    /// Pages where either checksum changed
    pub pages_changed: usize,
    /// URLs newly added to the frontier
    pub links_discovered: usize,
    /// Deepest level a batch was dispatched at
    pub deepest_depth: Option<u32>,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn new(start_url: CanonicalUrl) -> Self {
        Self {
            start_url: Some(start_url),
            ..Self::default()
        }
    }

    /// Successfully stored pages whose checksums both matched the stored ones
    pub fn unchanged(&self) -> usize {
        let stored = self
            .pages_fetched
            .saturating_sub(self.parse_failures + self.storage_failures);
        stored.saturating_sub(self.pages_changed)
    }

    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_processed as f64 / secs
        } else {
            0.0
        }
    }
}
