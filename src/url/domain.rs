use url::Url;

/// Removes a single leading `www.` label from a lowercase host
pub(crate) fn strip_www(host: &str) -> &str {
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest,
        _ => host,
    }
}

/// Extracts the site key of a URL
///
/// The key is the lowercase host with a leading `www.` removed, followed by
/// `:port` when the URL carries an explicit non-default port. Two URLs belong
/// to the same site exactly when their keys are equal.
///
/// # Arguments
///
/// * `url` - The URL to extract the key from
///
/// # Returns
///
/// * `Some(String)` - The site key
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use delta_crawl::url::host_key;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(host_key(&url), Some("localhost:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = strip_www(&host);

    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Returns true when both URLs share a site key
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (host_key(a), host_key(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
