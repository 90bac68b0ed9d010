//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::PageAssets;
use crate::storage::PageRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The orchestrator owns its storage for the duration of a run and only
/// touches it between fetch batches, so implementations need not be `Sync`.
pub trait Storage: Send {
    // ===== Crawl side =====

    /// Inserts or refreshes a page and reports what changed
    ///
    /// A new page reports `(true, true)`. For an existing page each flag is
    /// true exactly when the corresponding checksum differs from the stored
    /// one, and the matching `*_changed_at` timestamp advances only then.
    /// `last_seen` always advances. Calling twice with identical assets
    /// reports `(false, false)` the second time.
    ///
    /// # Returns
    ///
    /// `(content_changed, html_changed)`
    fn upsert_page(&mut self, assets: &PageAssets) -> StorageResult<(bool, bool)>;

    /// Gets a page by canonical URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Counts stored pages
    fn count_pages(&self) -> StorageResult<u64>;

    // ===== Embedding side =====

    /// Lists `(url, clean_text)` for pages never embedded or whose content
    /// changed after their last embedding
    fn pages_for_embedding(&self) -> StorageResult<Vec<(String, String)>>;

    /// Stores chunk vectors and their mean as the page vector, and advances
    /// `embedded_at`
    ///
    /// Existing chunks for the page are replaced. An empty vector list clears
    /// the chunks and the page vector but still marks the page embedded.
    fn save_vectors(&mut self, url: &str, vectors: &[Vec<f32>]) -> StorageResult<()>;

    /// Gets the stored chunk vectors of a page in chunk order
    fn chunk_vectors(&self, url: &str) -> StorageResult<Vec<Vec<f32>>>;
}
