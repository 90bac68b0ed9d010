//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Page upserts with change tracking
//! - Embedding hand-off (pending pages, chunk and page vectors)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::detect::Checksum;

/// Represents a page in the database
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub url: String,
    pub title: Option<String>,
    pub clean_text: String,
    pub seo_head: String,
    pub content_checksum: Checksum,
    pub head_checksum: Checksum,
    /// Last time the page was successfully parsed
    pub last_seen: String,
    pub content_changed_at: String,
    pub html_changed_at: String,
    /// Advanced only by [`Storage::save_vectors`]
    pub embedded_at: Option<String>,
    /// Mean of the chunk vectors
    pub summary_vector: Option<Vec<f32>>,
}

impl PageRecord {
    /// True when the page has never been embedded or changed since it was
    pub fn needs_embedding(&self) -> bool {
        match &self.embedded_at {
            None => true,
            Some(embedded) => self.content_changed_at.as_str() > embedded.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::digest;

    fn record(content_changed_at: &str, embedded_at: Option<&str>) -> PageRecord {
        PageRecord {
            url: "https://example.com/".to_string(),
            title: None,
            clean_text: String::new(),
            seo_head: String::new(),
            content_checksum: digest(""),
            head_checksum: digest(""),
            last_seen: content_changed_at.to_string(),
            content_changed_at: content_changed_at.to_string(),
            html_changed_at: content_changed_at.to_string(),
            embedded_at: embedded_at.map(|s| s.to_string()),
            summary_vector: None,
        }
    }

    #[test]
    fn test_needs_embedding() {
        assert!(record("2024-01-01T00:00:00.000000Z", None).needs_embedding());
        assert!(record(
            "2024-01-02T00:00:00.000000Z",
            Some("2024-01-01T00:00:00.000000Z")
        )
        .needs_embedding());
        assert!(!record(
            "2024-01-01T00:00:00.000000Z",
            Some("2024-01-02T00:00:00.000000Z")
        )
        .needs_embedding());
    }
}
