//! Page parsers
//!
//! A parser turns fetched content into [`PageAssets`]: the clean text the
//! content checksum is computed over, the raw HTML the head checksum is
//! computed over, and a few descriptive fields for storage.

use crate::crawler::fetcher::Extra;
use crate::detect::{self, digest, head_checksum, scrub_dynamic, Checksum};
use crate::url::CanonicalUrl;
use serde_json::Value;
use thiserror::Error;

/// Parser failures; each aborts only the page being parsed
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Parser expects `{0}` in the fetch payload")]
    MissingExtra(&'static str),

    #[error("Fetch payload field `{0}` has the wrong type")]
    InvalidExtra(&'static str),
}

/// Everything storage needs to know about a parsed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAssets {
    pub url: CanonicalUrl,
    pub raw_html: String,
    pub clean_text: String,
    /// Serialized SEO head (HTML `<head>` or backend metadata JSON)
    pub seo_head: String,
    pub title: Option<String>,
    pub content_checksum: Checksum,
    pub head_checksum: Checksum,
}

impl PageAssets {
    /// Builds assets, deriving both checksums from `clean_text` and `raw_html`
    pub fn new(
        url: CanonicalUrl,
        raw_html: String,
        clean_text: String,
        seo_head: String,
        title: Option<String>,
    ) -> Self {
        Self {
            content_checksum: digest(&clean_text),
            head_checksum: head_checksum(&raw_html),
            url,
            raw_html,
            clean_text,
            seo_head,
            title,
        }
    }
}

/// Converts fetched content into page assets
pub trait Parser: Send + Sync {
    /// Parses one page
    ///
    /// # Arguments
    ///
    /// * `url` - The canonical URL the content was fetched from
    /// * `content` - The fetched HTML
    /// * `extra` - Backend payload, if the fetcher supplied one
    fn parse(
        &self,
        url: &CanonicalUrl,
        content: &str,
        extra: Option<&Extra>,
    ) -> Result<PageAssets, ParseError>;
}

/// Parser that extracts clean text from the HTML itself
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl Parser for HtmlParser {
    fn parse(
        &self,
        url: &CanonicalUrl,
        content: &str,
        _extra: Option<&Extra>,
    ) -> Result<PageAssets, ParseError> {
        if content.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }

        let detection = detect::detect(content);

        Ok(PageAssets {
            url: url.clone(),
            raw_html: content.to_string(),
            clean_text: detection.clean_text,
            seo_head: detect::head_html(content),
            title: detection.title,
            content_checksum: detection.content_checksum,
            head_checksum: detection.head_checksum,
        })
    }
}

/// Parser that uses the markdown rendering supplied by the scrape backend
///
/// Volatile tokens (timestamps, hashes, session ids) are scrubbed from the
/// markdown before it becomes the page's clean text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl Parser for MarkdownParser {
    fn parse(
        &self,
        url: &CanonicalUrl,
        content: &str,
        extra: Option<&Extra>,
    ) -> Result<PageAssets, ParseError> {
        let extra = extra.ok_or(ParseError::MissingExtra("markdown"))?;
        let markdown = extra
            .get("markdown")
            .ok_or(ParseError::MissingExtra("markdown"))?
            .as_str()
            .ok_or(ParseError::InvalidExtra("markdown"))?;

        let metadata = extra.get("metadata").filter(|m| !m.is_null());

        let title = metadata
            .and_then(|m| m.get("title"))
            .and_then(Value::as_str)
            .map(detect::collapse_whitespace)
            .filter(|t| !t.is_empty())
            .or_else(|| detect::extract_title(content))
            .or_else(|| first_markdown_heading(markdown));

        let seo_head = metadata.map(|m| m.to_string()).unwrap_or_default();

        Ok(PageAssets::new(
            url.clone(),
            content.to_string(),
            scrub_dynamic(markdown),
            seo_head,
            title,
        ))
    }
}

fn first_markdown_heading(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("# "))
        .map(|heading| heading.trim().to_string())
        .filter(|heading| !heading.is_empty())
}
