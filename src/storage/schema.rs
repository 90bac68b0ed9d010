//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Delta-Crawl database.

/// SQL schema for the database
///
/// Timestamps are RFC 3339 UTC strings with microsecond precision, so
/// lexicographic order equals chronological order. Vectors are JSON arrays.
pub const SCHEMA_SQL: &str = r#"
-- One row per canonical URL that was successfully parsed at least once
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    title TEXT,
    clean_text TEXT NOT NULL,
    seo_head TEXT NOT NULL DEFAULT '',
    content_checksum TEXT NOT NULL,
    head_checksum TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    content_changed_at TEXT NOT NULL,
    html_changed_at TEXT NOT NULL,
    embedded_at TEXT,
    summary_vector TEXT
);

CREATE INDEX IF NOT EXISTS idx_pages_embedding ON pages(embedded_at, content_changed_at);

-- Per-chunk embedding vectors
CREATE TABLE IF NOT EXISTS chunks (
    page_url TEXT NOT NULL REFERENCES pages(url) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    vector TEXT NOT NULL,
    PRIMARY KEY (page_url, chunk_index)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
