//! Statistics rendering for crawl runs and the page store
//!
//! Report text is built as a `String` first so it can be checked in tests;
//! the `print_*` functions only write it to stdout.

use crate::crawler::CrawlReport;
use crate::storage::{Storage, StorageResult};

/// Store-wide statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Total number of stored pages
    pub total_pages: u64,

    /// Pages never embedded or changed since their last embedding
    pub pending_embeddings: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<StoreStatistics> {
    let total_pages = storage.count_pages()?;
    let pending_embeddings = storage.pages_for_embedding()?.len() as u64;

    Ok(StoreStatistics {
        total_pages,
        pending_embeddings,
    })
}

/// Renders a crawl report
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::from("=== Crawl Report ===\n\n");

    if let Some(start_url) = &report.start_url {
        out.push_str(&format!("Start URL: {}\n", start_url));
    }
    let deepest = report
        .deepest_depth
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!("Deepest level: {}\n", deepest));
    out.push_str(&format!(
        "Elapsed: {:.2}s ({:.1} pages/s)\n\n",
        report.elapsed.as_secs_f64(),
        report.pages_per_second()
    ));

    out.push_str("Pages:\n");
    out.push_str(&format!("  Processed: {}\n", report.pages_processed));
    out.push_str(&format!("  Fetched: {}\n", report.pages_fetched));
    out.push_str(&format!("  Links discovered: {}\n\n", report.links_discovered));

    out.push_str("Changes:\n");
    out.push_str(&format!("  Content changed: {}\n", report.content_changed));
    out.push_str(&format!("  Head changed: {}\n", report.head_changed));
    out.push_str(&format!("  Unchanged: {}\n", report.unchanged()));

    let failures = report.fetch_failures + report.parse_failures + report.storage_failures;
    if failures > 0 {
        out.push_str("\nFailures:\n");
        out.push_str(&format!("  Fetch: {}\n", report.fetch_failures));
        out.push_str(&format!("  Parse: {}\n", report.parse_failures));
        out.push_str(&format!("  Storage: {}\n", report.storage_failures));
    }

    out
}

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Prints store statistics to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    println!("Store:");
    println!("  Total pages: {}", stats.total_pages);
    println!("  Pending embeddings: {}", stats.pending_embeddings);
}

/// Prints every URL waiting for an embedding pass
pub fn print_pending_embeddings(storage: &dyn Storage) -> StorageResult<()> {
    let pending = storage.pages_for_embedding()?;

    println!("Pending Embeddings ({}):", pending.len());
    for (url, text) in &pending {
        println!("  - {} ({} words)", url, text.split_whitespace().count());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PageAssets;
    use crate::storage::SqliteStorage;
    use crate::url::canonicalize;
    use std::time::Duration;

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for path in ["/a", "/b"] {
            let assets = PageAssets::new(
                canonicalize(&format!("https://example.com{}", path)),
                String::new(),
                "text".to_string(),
                String::new(),
                None,
            );
            storage.upsert_page(&assets).unwrap();
        }
        storage.save_vectors("https://example.com/a", &[vec![1.0]]).unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(
            stats,
            StoreStatistics {
                total_pages: 2,
                pending_embeddings: 1
            }
        );
    }

    #[test]
    fn test_format_report() {
        let report = CrawlReport {
            start_url: Some(canonicalize("https://example.com/")),
            pages_processed: 4,
            pages_fetched: 3,
            fetch_failures: 1,
            content_changed: 2,
            head_changed: 1,
            pages_changed: 2,
            deepest_depth: Some(1),
            elapsed: Duration::from_secs(2),
            ..CrawlReport::default()
        };

        let text = format_report(&report);
        assert!(text.starts_with("=== Crawl Report ==="));
        assert!(text.contains("Start URL: https://example.com/"));
        assert!(text.contains("Deepest level: 1"));
        assert!(text.contains("Processed: 4"));
        assert!(text.contains("Content changed: 2"));
        assert!(text.contains("Unchanged: 1"));
        assert!(text.contains("Fetch: 1"));
    }

    #[test]
    fn test_format_report_omits_empty_failures() {
        let text = format_report(&CrawlReport::default());
        assert!(text.contains("Deepest level: -"));
        assert!(!text.contains("Failures:"));
    }
}
