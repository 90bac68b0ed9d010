//! Integration tests for the crawler
//!
//! Most tests drive the coordinator against an in-process site graph; the
//! last two use wiremock servers to run the shipped fetchers end-to-end.

use async_trait::async_trait;
use delta_crawl::config::{Config, CrawlerConfig, FetcherBackend, ParserKind};
use delta_crawl::crawler::{
    Coordinator, CrawlPhase, CrawlReport, FetchError, FetchResult, Fetcher, HtmlParser,
};
use delta_crawl::storage::{SqliteStorage, Storage};
use delta_crawl::url::{canonicalize, CanonicalUrl};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "https://site.test";

/// A site held in memory; every dispatched URL is recorded in order
#[derive(Default)]
struct FakeSite {
    pages: Mutex<HashMap<String, String>>,
    dispatched: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn add(&self, page_path: &str, title: &str, body: &str, links: &[&str]) {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l))
            .collect();
        let html = format!(
            "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
            title, body, anchors
        );
        self.pages
            .lock()
            .unwrap()
            .insert(canonicalize(&format!("{}{}", SITE, page_path)).into_string(), html);
    }

    fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }

    fn was_fetched(&self, page_path: &str) -> bool {
        let url = canonicalize(&format!("{}{}", SITE, page_path)).into_string();
        self.dispatched().contains(&url)
    }
}

#[async_trait]
impl Fetcher for FakeSite {
    async fn fetch(&self, url: &CanonicalUrl) -> FetchResult {
        self.dispatched.lock().unwrap().push(url.to_string());
        let page = self.pages.lock().unwrap().get(url.as_str()).cloned();
        match page {
            Some(html) => FetchResult::ok(url.clone(), html, Some("text/html".to_string())),
            None => FetchResult::failed(url.clone(), FetchError::Status(404)),
        }
    }
}

fn limits(max_depth: u32, max_pages: usize) -> CrawlerConfig {
    CrawlerConfig {
        max_depth,
        max_pages,
        crawl_delay: 0.0,
        concurrency: 4,
    }
}

async fn crawl_in_memory(site: &Arc<FakeSite>, config: &CrawlerConfig) -> (CrawlReport, Coordinator) {
    let mut coordinator = Coordinator::new(
        config,
        site.clone(),
        Box::new(HtmlParser),
        Box::new(SqliteStorage::new_in_memory().unwrap()),
    );
    let report = coordinator.run(&format!("{}/", SITE)).await.unwrap();
    (report, coordinator)
}

async fn crawl_on_disk(site: &Arc<FakeSite>, db_path: &Path, max_depth: u32) -> CrawlReport {
    let mut coordinator = Coordinator::new(
        &limits(max_depth, 100),
        site.clone(),
        Box::new(HtmlParser),
        Box::new(SqliteStorage::new(db_path).unwrap()),
    );
    coordinator.run(&format!("{}/", SITE)).await.unwrap()
}

#[tokio::test]
async fn test_depth_limit_bounds_traversal() {
    let site = FakeSite::new();
    site.add("/", "A", "page a", &["/b"]);
    site.add("/b", "B", "page b", &["/c"]);
    site.add("/c", "C", "page c", &[]);

    let (report, coordinator) = crawl_in_memory(&site, &limits(1, 100)).await;

    assert_eq!(report.pages_processed, 2);
    assert!(site.was_fetched("/"));
    assert!(site.was_fetched("/b"));
    assert!(!site.was_fetched("/c"));
    assert_eq!(report.deepest_depth, Some(1));
    assert_eq!(coordinator.phase(), CrawlPhase::Done);
}

#[tokio::test]
async fn test_max_pages_cuts_off_crawl() {
    let site = FakeSite::new();
    let children: Vec<String> = (1..=9).map(|i| format!("/p{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();
    site.add("/", "Hub", "hub", &child_refs);
    for child in &children {
        site.add(child, "Child", "leaf", &[]);
    }

    let (report, coordinator) = crawl_in_memory(&site, &limits(3, 3)).await;

    assert_eq!(report.pages_processed, 3);
    assert_eq!(site.dispatched().len(), 3);
    assert_eq!(coordinator.storage().count_pages().unwrap(), 3);
}

#[tokio::test]
async fn test_breadth_first_order_without_duplicates() {
    // Shortest distances: / = 0; a, b, c = 1; d, e = 2
    let site = FakeSite::new();
    site.add("/", "Root", "root", &["/a", "/b", "/c"]);
    site.add("/a", "A", "a", &["/c", "/d", "/"]);
    site.add("/b", "B", "b", &["/d"]);
    site.add("/c", "C", "c", &["/e"]);
    site.add("/d", "D", "d", &["/a", "/e"]);
    site.add("/e", "E", "e", &[]);

    let (report, _) = crawl_in_memory(&site, &limits(5, 100)).await;

    let distance: HashMap<String, u32> = [("/", 0), ("/a", 1), ("/b", 1), ("/c", 1), ("/d", 2), ("/e", 2)]
        .into_iter()
        .map(|(p, d)| (canonicalize(&format!("{}{}", SITE, p)).into_string(), d))
        .collect();

    let dispatched = site.dispatched();
    assert_eq!(dispatched.len(), 6);
    assert_eq!(dispatched.iter().collect::<HashSet<_>>().len(), 6);

    let depths: Vec<u32> = dispatched.iter().map(|u| distance[u]).collect();
    assert!(depths.windows(2).all(|w| w[0] <= w[1]), "depths {:?}", depths);

    assert_eq!(report.pages_processed, 6);
    assert_eq!(report.deepest_depth, Some(2));
}

#[tokio::test]
async fn test_fetch_failure_does_not_stop_crawl() {
    let site = FakeSite::new();
    site.add("/", "Root", "root", &["/missing", "/b"]);
    site.add("/b", "B", "b", &["/c"]);
    site.add("/c", "C", "c", &[]);

    let (report, coordinator) = crawl_in_memory(&site, &limits(2, 100)).await;

    assert_eq!(report.pages_processed, 4);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.pages_fetched, 3);
    assert!(site.was_fetched("/c"));
    assert!(coordinator
        .frontier()
        .is_processed(&canonicalize("https://site.test/missing")));
    assert_eq!(coordinator.storage().count_pages().unwrap(), 3);
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");

    let site = FakeSite::new();
    site.add("/", "Root", "root text", &["/a", "/b"]);
    site.add("/a", "A", "a text", &[]);
    site.add("/b", "B", "b text", &[]);

    let first = crawl_on_disk(&site, &db_path, 2).await;
    assert_eq!(first.content_changed, 3);
    assert_eq!(first.head_changed, 3);

    let second = crawl_on_disk(&site, &db_path, 2).await;
    assert_eq!(second.pages_processed, 3);
    assert_eq!(second.content_changed, 0);
    assert_eq!(second.head_changed, 0);
    assert_eq!(second.unchanged(), 3);
}

#[tokio::test]
async fn test_recrawl_detects_body_and_head_changes() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");

    let site = FakeSite::new();
    site.add("/", "Root", "root text", &["/a", "/b"]);
    site.add("/a", "A", "a text", &[]);
    site.add("/b", "B", "b text", &[]);
    crawl_on_disk(&site, &db_path, 2).await;

    // Body-only edit: content changes, head does not
    site.add("/a", "A", "a text, revised", &[]);
    let report = crawl_on_disk(&site, &db_path, 2).await;
    assert_eq!(report.content_changed, 1);
    assert_eq!(report.head_changed, 0);
    assert_eq!(report.pages_changed, 1);
    assert_eq!(report.unchanged(), 2);

    // Title edit: the head changes too
    site.add("/b", "B renamed", "b text", &[]);
    let report = crawl_on_disk(&site, &db_path, 2).await;
    assert_eq!(report.head_changed, 1);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let pending: Vec<String> = storage
        .pages_for_embedding()
        .unwrap()
        .into_iter()
        .map(|(url, _)| url)
        .collect();
    assert_eq!(pending.len(), 3);
    assert!(pending.contains(&"https://site.test/a".to_string()));
}

#[tokio::test]
async fn test_http_crawl_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<html><head><title>Home</title></head><body>
                <a href="/page1">Page 1</a>
                <a href="{}/page2#top">Page 2</a>
                <a href="/doc.pdf">Document</a>
                <a href="https://other.org/">Elsewhere</a>
                </body></html>"#,
                base_url
            ),
            "text/html",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><title>Page 1</title></head><body>
            <p>First page</p><a href="/">Home</a><a href="/page2">Page 2</a>
            </body></html>"#,
            "text/html",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<html><head><title>Page 2</title></head><body><p>Second page</p></body></html>",
            "text/html; charset=utf-8",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.crawler = limits(2, 100);
    config.storage.database_path = dir.path().join("crawl.db").to_string_lossy().into_owned();

    let mut coordinator = Coordinator::from_config(&config).unwrap();
    let report = coordinator.run(&base_url).await.unwrap();

    assert_eq!(report.pages_processed, 4);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.content_changed, 3);

    let storage = coordinator.storage();
    assert_eq!(storage.count_pages().unwrap(), 3);

    let page1 = storage
        .get_page(&format!("{}/page1", base_url))
        .unwrap()
        .expect("page1 should be stored");
    assert_eq!(page1.title.as_deref(), Some("Page 1"));
    assert!(page1.clean_text.contains("First page"));
    assert!(page1.seo_head.contains("<title>Page 1</title>"));

    // Second run against the same database sees nothing new
    let mut coordinator = Coordinator::from_config(&config).unwrap();
    let report = coordinator.run(&base_url).await.unwrap();
    assert_eq!(report.content_changed, 0);
    assert_eq!(report.head_changed, 0);
}

#[tokio::test]
async fn test_scrape_backend_with_markdown_parser() {
    let scrape_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(json!({ "url": "https://site.test/" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "html": "<html><head><title>Home</title></head><body>Welcome</body></html>",
                "markdown": "# Home\n\nWelcome, generated at 2024-05-01T10:00:00Z",
                "links": ["https://site.test/about", "https://elsewhere.org/x"],
                "metadata": { "title": "Home" }
            }
        })))
        .expect(1)
        .mount(&scrape_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/scrape"))
        .and(body_partial_json(json!({ "url": "https://site.test/about" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "html": "<html><body>About us</body></html>",
                "markdown": "# About\n\nAbout us",
                "links": ["https://site.test/"],
                "metadata": {}
            }
        })))
        .expect(1)
        .mount(&scrape_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.crawler = limits(2, 100);
    config.fetcher.backend = FetcherBackend::Scrape;
    config.fetcher.scrape_endpoint = scrape_server.uri();
    config.fetcher.max_retries = 0;
    config.fetcher.rate_limit_ms = 0;
    config.parser.kind = ParserKind::Markdown;
    config.storage.database_path = dir.path().join("crawl.db").to_string_lossy().into_owned();

    let mut coordinator = Coordinator::from_config(&config).unwrap();
    let report = coordinator.run("https://www.site.test").await.unwrap();

    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.fetch_failures, 0);

    let storage = coordinator.storage();
    let home = storage.get_page("https://site.test/").unwrap().unwrap();
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert!(!home.clean_text.contains("2024-05-01"));

    let about = storage.get_page("https://site.test/about").unwrap().unwrap();
    assert_eq!(about.title.as_deref(), Some("About"));
    assert!(about.clean_text.contains("About us"));
}
