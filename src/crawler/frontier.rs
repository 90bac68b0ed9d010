//! Breadth-first crawl frontier
//!
//! Tracks URLs that have been discovered but not yet dispatched, each tagged
//! with its link depth, plus the set of URLs that completed a fetch attempt
//! during this run. A URL is pending at most once, at the smallest depth it
//! was offered at, and is never re-queued once processed.

use crate::url::CanonicalUrl;
use indexmap::IndexMap;
use std::collections::HashSet;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: CanonicalUrl,
    pub depth: u32,
}

/// Pending URLs (insertion ordered) and the processed set
#[derive(Debug, Default)]
pub struct Frontier {
    /// url -> depth, in discovery order
    pending: IndexMap<CanonicalUrl, u32>,
    processed: HashSet<CanonicalUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all state and queues `url` at depth 0
    pub fn seed(&mut self, url: CanonicalUrl) {
        self.pending.clear();
        self.processed.clear();
        self.pending.insert(url, 0);
    }

    /// Offers a discovered URL at `depth`
    ///
    /// The URL is queued when it is neither pending nor processed. If it is
    /// already pending at a greater depth, its depth is lowered.
    ///
    /// # Returns
    ///
    /// `true` if the frontier changed
    pub fn offer(&mut self, url: CanonicalUrl, depth: u32) -> bool {
        if self.processed.contains(&url) {
            return false;
        }

        match self.pending.get_mut(&url) {
            Some(queued) if depth < *queued => {
                *queued = depth;
                true
            }
            Some(_) => false,
            None => {
                self.pending.insert(url, depth);
                true
            }
        }
    }

    /// Removes and returns every pending URL at exactly `depth`, in insertion order
    pub fn take_batch(&mut self, depth: u32) -> Vec<CanonicalUrl> {
        if !self.has_depth(depth) {
            return Vec::new();
        }

        let (batch, rest): (IndexMap<_, _>, IndexMap<_, _>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(_, d)| *d == depth);

        self.pending = rest;
        batch.into_keys().collect()
    }

    /// Puts URLs back at `depth` without touching the processed set
    ///
    /// Used when a batch is truncated to fit the page budget.
    pub fn requeue(&mut self, urls: impl IntoIterator<Item = CanonicalUrl>, depth: u32) {
        for url in urls {
            self.offer(url, depth);
        }
    }

    pub fn mark_processed<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = CanonicalUrl>,
    {
        self.processed.extend(urls);
    }

    /// True when something is pending at a depth no greater than `max_depth`
    pub fn has_work(&self, max_depth: u32) -> bool {
        self.lowest_depth().is_some_and(|d| d <= max_depth)
    }

    pub fn lowest_depth(&self) -> Option<u32> {
        self.pending.values().copied().min()
    }

    pub fn has_depth(&self, depth: u32) -> bool {
        self.pending.values().any(|&d| d == depth)
    }

    /// Pending entries in discovery order
    pub fn entries(&self) -> impl Iterator<Item = FrontierEntry> + '_ {
        self.pending.iter().map(|(url, &depth)| FrontierEntry {
            url: url.clone(),
            depth,
        })
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_pending(&self, url: &CanonicalUrl) -> bool {
        self.pending.contains_key(url)
    }

    pub fn is_processed(&self, url: &CanonicalUrl) -> bool {
        self.processed.contains(url)
    }

    /// Depth a pending URL is queued at
    pub fn depth_of(&self, url: &CanonicalUrl) -> Option<u32> {
        self.pending.get(url).copied()
    }
}
