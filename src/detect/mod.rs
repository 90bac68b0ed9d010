//! Change detection
//!
//! Every fetched page yields two SHA-256 checksums:
//!
//! - the **content checksum**, over the page's clean text (title, meta
//!   description, image alt text and visible main-content text), which gates
//!   re-embedding
//! - the **head checksum**, over the SEO-relevant `<head>` metadata (title,
//!   meta description and robots, canonical link, hreflang alternates and
//!   JSON-LD blocks)
//!
//! Both are pure functions of the HTML bytes: no clock, no randomness, and no
//! dependence on attribute iteration order.

mod extract;
mod head;
mod scrub;

use sha2::{Digest, Sha256};
use std::fmt;

pub use extract::{extract_clean_text, extract_title, head_html};
pub use head::head_checksum;
pub use scrub::scrub_dynamic;

/// A SHA-256 digest, rendered as 64 lowercase hex characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character hex string
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Hashes a piece of text with SHA-256
pub fn digest(text: &str) -> Checksum {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Checksum(bytes)
}

/// Output of [`detect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Page title (`<title>`, falling back to the first `<h1>`)
    pub title: Option<String>,
    /// Whitespace-collapsed text the content checksum is computed over
    pub clean_text: String,
    pub content_checksum: Checksum,
    pub head_checksum: Checksum,
}

/// Runs the change detector over a raw HTML document
///
/// # Example
///
/// ```
/// use delta_crawl::detect::detect;
///
/// let html = "<html><head><title>Hi</title></head><body><p>Hello</p></body></html>";
/// let d = detect(html);
/// assert_eq!(d.clean_text, "Hi Hello");
/// assert_eq!(d.content_checksum.to_hex().len(), 64);
/// ```
pub fn detect(html: &str) -> Detection {
    let document = scraper::Html::parse_document(html);
    let title = extract::title_of(&document);
    let clean_text = extract::clean_text_of(&document, title.as_deref());

    Detection {
        content_checksum: digest(&clean_text),
        head_checksum: head::head_checksum_of(&document),
        title,
        clean_text,
    }
}

/// Collapses every run of whitespace to a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
