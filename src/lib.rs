//! Delta-Crawl: an incremental site crawler with change detection
//!
//! This crate crawls a single site breadth-first, computes a content checksum
//! and a head checksum for every page, and records which pages changed since
//! the previous visit so a downstream embedding pipeline can re-index only
//! what moved.

pub mod config;
pub mod crawler;
pub mod detect;
pub mod embed;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Delta-Crawl operations
#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Embedding error: {0}")]
    Embed(#[from] embed::EmbedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Delta-Crawl operations
pub type Result<T> = std::result::Result<T, DeltaError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use detect::{detect, Checksum, Detection};
pub use url::{canonicalize, parse_crawlable, CanonicalUrl};
