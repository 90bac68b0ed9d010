//! URL handling module for Delta-Crawl
//!
//! This module provides canonicalization (the identity key of every page),
//! crawlability checks, and site-key extraction for same-site filtering.

mod canonical;
mod domain;

pub use canonical::{canonicalize, parse_crawlable, CanonicalUrl};
pub use domain::{host_key, same_site};
