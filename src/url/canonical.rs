use crate::url::domain;
use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A normalized URL string used as the identity key for a page
///
/// Two URLs that differ only in host case, a leading `www.`, the fragment, or
/// the order of query parameters map to the same `CanonicalUrl`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parses the canonical string back into a `Url`
    ///
    /// Returns `None` for keys produced by the best-effort fallback path.
    pub fn to_url(&self) -> Option<Url> {
        Url::parse(&self.0).ok()
    }

    /// Returns the site key (lowercase host without `www.`, plus any explicit port)
    pub fn host_key(&self) -> Option<String> {
        self.to_url().and_then(|u| domain::host_key(&u))
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&Url> for CanonicalUrl {
    fn from(url: &Url) -> Self {
        canonicalize(url.as_str())
    }
}

/// Normalizes a URL to its canonical key
///
/// # Normalization Steps
///
/// 1. Parse the URL (on failure fall back to a best-effort string cleanup)
/// 2. Lowercase the host and remove a leading `www.` label
/// 3. Remove the fragment
/// 4. Stable-sort query parameters by key; drop an empty query
/// 5. Remove trailing slashes from the path, except for the root `/`
///
/// Never fails. Crawlability is checked separately with [`parse_crawlable`].
///
/// # Examples
///
/// ```
/// use delta_crawl::url::canonicalize;
///
/// let a = canonicalize("https://WWW.Example.com/a/?b=2&a=1#top");
/// let b = canonicalize("https://example.com/a?a=1&b=2");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "https://example.com/a?a=1&b=2");
/// ```
pub fn canonicalize(raw_url: &str) -> CanonicalUrl {
    let trimmed = raw_url.trim();

    match Url::parse(trimmed) {
        Ok(url) => CanonicalUrl(normalize_parsed(url)),
        Err(_) => CanonicalUrl(fallback_normalize(trimmed)),
    }
}

/// Validates that a URL is an absolute http(s) URL with a host
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - The URL is malformed, uses another scheme, or has no host
pub fn parse_crawlable(raw_url: &str) -> UrlResult<Url> {
    let url = Url::parse(raw_url.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost),
    }
}

fn normalize_parsed(mut url: Url) -> String {
    if let Some(host) = url.host_str().map(str::to_lowercase) {
        let stripped = domain::strip_www(&host).to_string();
        if url.host_str() != Some(stripped.as_str()) {
            // On failure the parsed host is kept as-is
            let _ = url.set_host(Some(stripped.as_str()));
        }
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            // sort_by is stable: repeated keys keep their relative order
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }

    if !url.cannot_be_a_base() {
        let path = url.path();
        if path.len() > 1 && path.ends_with('/') {
            let trimmed = path.trim_end_matches('/');
            let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
            url.set_path(&trimmed);
        }
    }

    url.to_string()
}

fn fallback_normalize(raw: &str) -> String {
    let without_fragment = match raw.find('#') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    without_fragment.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_urls_canonicalize_identically() {
        let a = canonicalize("https://WWW.Example.com/a/?b=2&a=1");
        let b = canonicalize("https://example.com/a?a=1&b=2");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://example.com/a?a=1&b=2");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://WWW.Example.com/a/?b=2&a=1",
            "http://example.com",
            "https://example.com/path//",
            "https://example.com/search?q=hello%20world&lang=en",
            "https://example.com/?",
            "not a url at all/#frag",
            "https://example.com/x?flag",
        ];

        for input in inputs {
            let once = canonicalize(input);
            let twice = canonicalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_fragment_removed() {
        assert_eq!(
            canonicalize("https://example.com/page#section").as_str(),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_root_keeps_slash() {
        assert_eq!(
            canonicalize("https://example.com/").as_str(),
            "https://example.com/"
        );
        assert_eq!(
            canonicalize("https://example.com").as_str(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_trailing_slash_stripped() {
        assert_eq!(
            canonicalize("https://example.com/docs/").as_str(),
            "https://example.com/docs"
        );
    }

    #[test]
    fn test_repeated_keys_keep_order() {
        assert_eq!(
            canonicalize("https://example.com/?b=1&a=2&b=0").as_str(),
            "https://example.com/?a=2&b=1&b=0"
        );
    }

    #[test]
    fn test_empty_query_removed() {
        assert_eq!(
            canonicalize("https://example.com/page?").as_str(),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_scheme_and_port_preserved() {
        assert_eq!(
            canonicalize("http://Example.com:8080/a/").as_str(),
            "http://example.com:8080/a"
        );
    }

    #[test]
    fn test_malformed_input_best_effort() {
        assert_eq!(canonicalize("  /relative/path/#x ").as_str(), "/relative/path");
    }

    #[test]
    fn test_host_key() {
        let url = canonicalize("https://www.Example.com/a");
        assert_eq!(url.host_key(), Some("example.com".to_string()));

        let url = canonicalize("http://127.0.0.1:4000/a");
        assert_eq!(url.host_key(), Some("127.0.0.1:4000".to_string()));

        let url = canonicalize("/relative");
        assert_eq!(url.host_key(), None);
    }

    #[test]
    fn test_parse_crawlable() {
        assert!(parse_crawlable("https://example.com/").is_ok());
        assert!(parse_crawlable("http://example.com/a").is_ok());
        assert!(matches!(
            parse_crawlable("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            parse_crawlable("not a url"),
            Err(UrlError::Parse(_))
        ));
        assert!(matches!(
            parse_crawlable("mailto:someone@example.com"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_display_and_serde_transparent() {
        let url = canonicalize("https://example.com/a");
        assert_eq!(url.to_string(), "https://example.com/a");

        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, "\"https://example.com/a\"");
    }
}
