//! Link extraction
//!
//! Turns a page's outgoing references into same-site canonical URLs:
//! - `<a href>` anchors from the HTML (anchors marked `download` are skipped)
//! - or, when the fetch backend supplied one, its own link list
//!
//! `javascript:`, `mailto:`, `tel:` and `data:` references are dropped, as is
//! anything that does not resolve to http(s) on the base URL's site.

use crate::crawler::fetcher::Extra;
use crate::url::{canonicalize, host_key, CanonicalUrl};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

const REJECTED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Page input for link extraction
#[derive(Debug, Clone, Copy)]
pub struct LinkSource<'a> {
    pub html: &'a str,
    /// Backend-supplied link list; takes precedence over the HTML
    pub discovered_links: Option<&'a [String]>,
}

impl<'a> LinkSource<'a> {
    pub fn html(html: &'a str) -> Self {
        Self {
            html,
            discovered_links: None,
        }
    }
}

/// Extracts the same-site links of a page
///
/// # Arguments
///
/// * `base_url` - The page URL, used to resolve relative references and as
///   the site every kept link must share
/// * `page` - HTML and optional backend link list
///
/// # Returns
///
/// Deduplicated canonical URLs in discovery order
///
/// # Example
///
/// ```
/// use delta_crawl::crawler::{extract_links, LinkSource};
/// use delta_crawl::url::canonicalize;
///
/// let base = canonicalize("https://example.com/docs/");
/// let html = r#"<a href="intro">Intro</a><a href="https://other.org/">Out</a>"#;
/// let links = extract_links(&base, LinkSource::html(html));
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://example.com/intro");
/// ```
pub fn extract_links(base_url: &CanonicalUrl, page: LinkSource<'_>) -> Vec<CanonicalUrl> {
    let Some(base) = base_url.to_url() else {
        return Vec::new();
    };
    let Some(site) = host_key(&base) else {
        return Vec::new();
    };

    let candidates = match page.discovered_links {
        Some(list) => list.to_vec(),
        None => anchor_hrefs(page.html),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in candidates {
        let Some(resolved) = resolve_link(&href, &base) else {
            continue;
        };

        let canonical = canonicalize(resolved.as_str());
        if canonical.host_key().as_deref() != Some(site.as_str()) {
            tracing::debug!("Skipping off-site link {}", canonical);
            continue;
        }

        if seen.insert(canonical.clone()) {
            links.push(canonical);
        }
    }

    links
}

/// Reads the `links` array out of a backend payload
pub fn links_from_extra(extra: &Extra) -> Option<Vec<String>> {
    let list = extra.get("links")?.as_array()?;
    Some(
        list.iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
    )
}

/// Collects `href` values of `<a>` tags in document order
fn anchor_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut hrefs = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                hrefs.push(href.to_string());
            }
        }
    }

    hrefs
}

/// Resolves an href against the base URL
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only references
/// - javascript:, mailto:, tel: and data: schemes
/// - references that fail to resolve or are not http(s) afterwards
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    let href = match href.find('#') {
        Some(idx) => &href[..idx],
        None => href,
    };

    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if REJECTED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute)
    } else {
        None
    }
}
