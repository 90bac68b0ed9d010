//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::PageAssets;
use crate::detect::Checksum;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::PageRecord;
use chrono::{SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for tests and dry runs)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Current time as an RFC 3339 UTC string with microsecond precision
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(StorageError::Serialization(message)),
    )
}

fn checksum_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Checksum> {
    let hex: String = row.get(idx)?;
    Checksum::from_hex(&hex).ok_or_else(|| conversion_error(idx, format!("bad checksum '{}'", hex)))
}

fn vector_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Vec<f32>>> {
    let json: Option<String> = row.get(idx)?;
    json.map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(idx, e.to_string())))
        .transpose()
}

fn encode_vector(vector: &[f32]) -> StorageResult<String> {
    serde_json::to_string(vector).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Element-wise mean of equally sized vectors
fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut sum = vec![0.0f32; first.len()];
    for vector in vectors {
        for (acc, value) in sum.iter_mut().zip(vector) {
            *acc += value;
        }
    }
    let n = vectors.len() as f32;
    Some(sum.into_iter().map(|v| v / n).collect())
}

impl Storage for SqliteStorage {
    // ===== Crawl side =====

    fn upsert_page(&mut self, assets: &PageAssets) -> StorageResult<(bool, bool)> {
        let url = assets.url.as_str();
        let content_checksum = assets.content_checksum.to_hex();
        let head_checksum = assets.head_checksum.to_hex();
        let now = now_timestamp();

        let existing: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT content_checksum, head_checksum FROM pages WHERE url = ?1",
                params![url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((old_content, old_head)) = existing else {
            self.conn.execute(
                "INSERT INTO pages (url, title, clean_text, seo_head, content_checksum, head_checksum,
                 last_seen, content_changed_at, html_changed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)",
                params![
                    url,
                    assets.title,
                    assets.clean_text,
                    assets.seo_head,
                    content_checksum,
                    head_checksum,
                    now
                ],
            )?;
            return Ok((true, true));
        };

        let content_changed = old_content != content_checksum;
        let html_changed = old_head != head_checksum;

        self.conn.execute(
            "UPDATE pages SET title = ?2, clean_text = ?3, seo_head = ?4,
             content_checksum = ?5, head_checksum = ?6, last_seen = ?7,
             content_changed_at = CASE WHEN ?8 THEN ?7 ELSE content_changed_at END,
             html_changed_at = CASE WHEN ?9 THEN ?7 ELSE html_changed_at END
             WHERE url = ?1",
            params![
                url,
                assets.title,
                assets.clean_text,
                assets.seo_head,
                content_checksum,
                head_checksum,
                now,
                content_changed,
                html_changed
            ],
        )?;

        Ok((content_changed, html_changed))
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, title, clean_text, seo_head, content_checksum, head_checksum,
             last_seen, content_changed_at, html_changed_at, embedded_at, summary_vector
             FROM pages WHERE url = ?1",
        )?;

        let page = stmt
            .query_row(params![url], |row| {
                Ok(PageRecord {
                    url: row.get(0)?,
                    title: row.get(1)?,
                    clean_text: row.get(2)?,
                    seo_head: row.get(3)?,
                    content_checksum: checksum_column(row, 4)?,
                    head_checksum: checksum_column(row, 5)?,
                    last_seen: row.get(6)?,
                    content_changed_at: row.get(7)?,
                    html_changed_at: row.get(8)?,
                    embedded_at: row.get(9)?,
                    summary_vector: vector_column(row, 10)?,
                })
            })
            .optional()?;

        Ok(page)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Embedding side =====

    fn pages_for_embedding(&self) -> StorageResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, clean_text FROM pages
             WHERE embedded_at IS NULL OR content_changed_at > embedded_at
             ORDER BY url",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn save_vectors(&mut self, url: &str, vectors: &[Vec<f32>]) -> StorageResult<()> {
        if let Some(first) = vectors.first() {
            if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
                return Err(StorageError::DimensionMismatch {
                    expected: first.len(),
                    got: bad.len(),
                });
            }
        }

        let summary = mean_vector(vectors)
            .map(|v| encode_vector(&v))
            .transpose()?;
        let encoded = vectors
            .iter()
            .map(|v| encode_vector(v))
            .collect::<StorageResult<Vec<_>>>()?;

        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE pages SET summary_vector = ?2, embedded_at = ?3 WHERE url = ?1",
            params![url, summary, now_timestamp()],
        )?;
        if updated == 0 {
            return Err(StorageError::PageNotFound(url.to_string()));
        }

        tx.execute("DELETE FROM chunks WHERE page_url = ?1", params![url])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO chunks (page_url, chunk_index, vector) VALUES (?1, ?2, ?3)",
            )?;
            for (index, vector) in encoded.iter().enumerate() {
                insert.execute(params![url, index as i64, vector])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn chunk_vectors(&self, url: &str) -> StorageResult<Vec<Vec<f32>>> {
        let mut stmt = self.conn.prepare(
            "SELECT vector FROM chunks WHERE page_url = ?1 ORDER BY chunk_index",
        )?;

        let rows = stmt
            .query_map(params![url], |row| {
                vector_column(row, 0).map(|v| v.unwrap_or_default())
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
