//! Removal of volatile tokens before hashing markdown

use crate::detect::collapse_whitespace;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static ISO_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?")
        .expect("hardcoded regex pattern is valid")
});

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b")
        .expect("hardcoded regex pattern is valid")
});

static CALENDAR_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \b\d{4}-\d{2}-\d{2}\b
        | \b\d{1,2}/\d{1,2}/\d{2,4}\b
        | \b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}\b
        | \b\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?,?\s+\d{4}\b
        ",
    )
    .expect("hardcoded regex pattern is valid")
});

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}(?::\d{2})?(?:\s?[ap]\.?m\.?)?\b")
        .expect("hardcoded regex pattern is valid")
});

static HEX_DIGEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9a-fA-F]{16,}\b").expect("hardcoded regex pattern is valid"));

static LONG_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9_-]{32,}\b").expect("hardcoded regex pattern is valid"));

/// Strips timestamps, dates, clock times, UUIDs, hex digests and long random
/// tokens from text, then collapses whitespace
///
/// Pages rendered by a scraping service often embed "last updated" stamps,
/// cache-busting hashes and session tokens; without scrubbing, every fetch
/// would look like a content change.
///
/// # Example
///
/// ```
/// use delta_crawl::detect::scrub_dynamic;
///
/// let text = "Updated 2024-03-01T10:15:00Z by build 9f86d081884c7d659a2feaa0c55ad015";
/// assert_eq!(scrub_dynamic(text), "Updated by build");
/// ```
pub fn scrub_dynamic(text: &str) -> String {
    let text = ISO_TIMESTAMP.replace_all(text, " ");
    let text = UUID.replace_all(&text, " ");
    let text = CALENDAR_DATE.replace_all(&text, " ");
    let text = CLOCK_TIME.replace_all(&text, " ");
    let text = HEX_DIGEST.replace_all(&text, " ");
    let text = LONG_TOKEN.replace_all(&text, |caps: &Captures| {
        let token = &caps[0];
        let has_letter = token.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = token.chars().any(|c| c.is_ascii_digit());
        if has_letter && has_digit {
            " ".to_string()
        } else {
            token.to_string()
        }
    });

    collapse_whitespace(&text)
}
