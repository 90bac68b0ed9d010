//! Output module for crawl summaries
//!
//! This module handles:
//! - Rendering the end-of-run crawl report
//! - Loading and displaying store-wide statistics
//! - Listing pages still waiting for an embedding pass

pub mod stats;

pub use stats::{
    format_report, load_statistics, print_pending_embeddings, print_report, print_statistics,
    StoreStatistics,
};
