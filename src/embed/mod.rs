//! Embedding hand-off
//!
//! The crawler only records *that* content changed. This module drains that
//! record: it pulls every page whose content changed since its last
//! embedding, splits the clean text into word-window chunks, asks an
//! [`Encoder`] for one vector per chunk, and stores the vectors back.
//!
//! The model behind the encoder lives outside this crate.

use crate::storage::{Storage, StorageError};
use thiserror::Error;

/// Default chunk size, in whitespace-separated tokens
pub const DEFAULT_CHUNK_TOKENS: usize = 500;

/// Errors raised while embedding a page
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Encoder failed: {0}")]
    Encoder(String),

    #[error("Encoder returned {got} vectors for {expected} chunks")]
    CountMismatch { expected: usize, got: usize },

    #[error("Encoder returned a {got}-dimensional vector, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A text embedding model
pub trait Encoder: Send + Sync {
    /// Dimensionality of every vector this encoder produces
    fn dim(&self) -> usize;

    /// Encodes each text into one vector, in order
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// Splits text into chunks of at most `max_tokens` whitespace tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    pub max_tokens: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_TOKENS)
    }
}

impl TextChunker {
    /// Creates a chunker; a zero window is treated as one token
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens: max_tokens.max(1),
        }
    }

    /// Splits one text into non-empty chunks
    ///
    /// # Example
    ///
    /// ```
    /// use delta_crawl::embed::TextChunker;
    ///
    /// let chunker = TextChunker::new(3);
    /// assert_eq!(
    ///     chunker.chunk_text("one two three four five"),
    ///     vec!["one two three", "four five"]
    /// );
    /// ```
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        tokens
            .chunks(self.max_tokens.max(1))
            .map(|window| window.join(" "))
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    /// Splits several texts, yielding chunks in order
    pub fn chunk_texts<'a, I>(&'a self, texts: I) -> impl Iterator<Item = String> + 'a
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: 'a,
    {
        texts.into_iter().flat_map(move |text| self.chunk_text(text))
    }
}

/// Embeds every page whose content changed since its last embedding
///
/// Pages whose encoding or storage fails are logged and skipped; they stay
/// pending and are retried by the next pass.
///
/// # Arguments
///
/// * `storage` - Store to read pending pages from and write vectors to
/// * `encoder` - Embedding model
/// * `chunker` - Chunking policy
///
/// # Returns
///
/// * `Ok(usize)` - Number of pages embedded
/// * `Err(EmbedError)` - The pending-page query failed
pub fn run_embedding_pass(
    storage: &mut dyn Storage,
    encoder: &dyn Encoder,
    chunker: &TextChunker,
) -> Result<usize, EmbedError> {
    let pending = storage.pages_for_embedding()?;
    tracing::info!("{} pages pending embedding", pending.len());

    let mut embedded = 0;
    for (url, text) in pending {
        match embed_page(storage, encoder, chunker, &url, &text) {
            Ok(chunks) => {
                tracing::debug!("Embedded {} ({} chunks)", url, chunks);
                embedded += 1;
            }
            Err(e) => tracing::warn!("Embedding failed for {}: {}", url, e),
        }
    }

    tracing::info!("Embedded {} pages", embedded);
    Ok(embedded)
}

fn embed_page(
    storage: &mut dyn Storage,
    encoder: &dyn Encoder,
    chunker: &TextChunker,
    url: &str,
    text: &str,
) -> Result<usize, EmbedError> {
    let chunks = chunker.chunk_text(text);

    let vectors = if chunks.is_empty() {
        Vec::new()
    } else {
        encoder.encode(&chunks)?
    };

    if vectors.len() != chunks.len() {
        return Err(EmbedError::CountMismatch {
            expected: chunks.len(),
            got: vectors.len(),
        });
    }

    let dim = encoder.dim();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(EmbedError::DimensionMismatch {
            expected: dim,
            got: bad.len(),
        });
    }

    storage.save_vectors(url, &vectors)?;
    Ok(chunks.len())
}
