//! Processed-history ledger: which event URLs already produced drafts.
//!
//! Insertion-ordered and bounded; recording past capacity evicts the oldest
//! entries first. Persisted as `{ "urls": [...] }` through an [`ObjectStore`].

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ScoutError, ScoutResult};
use crate::ingest::types::Candidate;
use crate::store::ObjectStore;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct ProcessedHistory {
    order: VecDeque<String>,
    index: HashSet<String>,
    cap: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryDoc {
    #[serde(default)]
    urls: Vec<String>,
}

impl Default for ProcessedHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ProcessedHistory {
    /// Capacity is clamped to at least 1.
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            order: VecDeque::with_capacity(cap.min(10_000)),
            index: HashSet::new(),
            cap,
        }
    }

    /// Rebuild from stored URLs (oldest first). Duplicates collapse onto their
    /// first position; anything beyond capacity is dropped from the front.
    pub fn from_urls(urls: impl IntoIterator<Item = String>, cap: usize) -> Self {
        let mut h = Self::with_capacity(cap);
        for u in urls {
            h.record(&u);
        }
        h
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains(url.trim())
    }

    /// Oldest first.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns `false` when the URL was blank or already present (no-op).
    pub fn record(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() || self.index.contains(url) {
            return false;
        }
        self.order.push_back(url.to_string());
        self.index.insert(url.to_string());
        while self.order.len() > self.cap {
            if let Some(old) = self.order.pop_front() {
                self.index.remove(&old);
            }
        }
        true
    }

    fn to_doc(&self) -> HistoryDoc {
        HistoryDoc {
            urls: self.order.iter().cloned().collect(),
        }
    }
}

/// Keep candidates whose URL is not in `history`, in their original order.
/// URL-less candidates are always fresh.
pub fn filter_fresh(candidates: Vec<Candidate>, history: &ProcessedHistory) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.dedup_key().map_or(true, |u| !history.contains(u)))
        .collect()
}

/// Loads and persists a [`ProcessedHistory`] under one store key.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn ObjectStore>,
    key: String,
    cap: usize,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("key", &self.key)
            .field("cap", &self.cap)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>, cap: usize) -> Self {
        Self {
            store,
            key: key.into(),
            cap: cap.max(1),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// A missing ledger is an empty history. An unreadable or corrupt one is
    /// an error: silently starting over would re-draft everything.
    pub async fn load(&self) -> ScoutResult<ProcessedHistory> {
        let bytes = self
            .store
            .get(&self.key)
            .await
            .map_err(|e| ScoutError::persistence(format!("reading ledger `{}`", self.key), e))?;

        let Some(bytes) = bytes else {
            info!(target: "history", key = %self.key, "no ledger yet, starting empty");
            return Ok(ProcessedHistory::with_capacity(self.cap));
        };

        let doc: HistoryDoc = serde_json::from_slice(&bytes)
            .map_err(|e| ScoutError::persistence(format!("parsing ledger `{}`", self.key), e))?;
        let history = ProcessedHistory::from_urls(doc.urls, self.cap);
        debug!(target: "history", key = %self.key, entries = history.len(), "ledger loaded");
        Ok(history)
    }

    /// Overwrites the stored ledger with `history`.
    pub async fn persist(&self, history: &ProcessedHistory) -> ScoutResult<()> {
        let body = serde_json::to_vec_pretty(&history.to_doc())
            .map_err(|e| ScoutError::persistence("serializing ledger", e))?;
        self.store
            .put(&self.key, body, None)
            .await
            .map_err(|e| ScoutError::persistence(format!("writing ledger `{}`", self.key), e))?;
        debug!(target: "history", key = %self.key, entries = history.len(), "ledger persisted");
        Ok(())
    }
}
