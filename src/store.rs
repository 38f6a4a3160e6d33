// src/store.rs
//! Durable-storage contract for the crawler plus the in-memory reference
//! implementation. Identity normalization and content hashing live here so
//! every store implementation deduplicates the same way.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use crate::fetch::CandidateItem;
use crate::sources::Locale;

/// A durable, deduplicated, scored content record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    pub source: String,
    pub title: String,
    pub url: Option<String>,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub brand: String,
    pub locale: Locale,
    /// Relevance score at time of acceptance, 0.0..=1.0, 2 decimals.
    pub score: f64,
    /// SHA-256 hex of the normalized identity string; unique upsert key.
    pub content_hash: String,
}

/// Outcome of an idempotent upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// A row with the same content hash already exists; silently ignored.
    Duplicate,
}

/// One row per crawl run, inserted at start and updated once at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub sources_count: usize,
    pub items_fetched: u64,
    pub items_new: u64,
    pub items_skipped: u64,
    /// Present only on fatal failure.
    pub error_details: Option<String>,
}

impl RunLog {
    pub fn started_now() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            sources_count: 0,
            items_fetched: 0,
            items_new: 0,
            items_skipped: 0,
            error_details: None,
        }
    }
}

/// Recently persisted item pointer for the diagnostics view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentUrl {
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

/// Normalized identity for deduplication: `scheme://host/path` when the item
/// has a URL (query string and fragment stripped), otherwise a synthetic
/// `title|published_at` key.
pub fn normalize_identity(item: &CandidateItem) -> String {
    match item.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => {
            let cut = url
                .find(['?', '#'])
                .map(|i| &url[..i])
                .unwrap_or(url);
            cut.to_string()
        }
        None => format!("{}|{}", item.title, item.published_at.to_rfc3339()),
    }
}

/// SHA-256 hex digest of the normalized identity string.
pub fn content_hash(normalized: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Storage consumed by the pipeline: a feed-items table with
/// upsert-on-conflict by content hash, range deletion for retention, and a
/// run-log table with insert-then-update-by-id.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Insert the item unless a row with the same `content_hash` exists.
    /// The duplicate case is a silent no-op, not an error.
    async fn upsert_item(&self, item: FeedItem) -> Result<UpsertOutcome>;

    /// Keep the `keep` most recent rows (by `published_at`) for `source_id`,
    /// hard-delete the rest. Returns the number of deleted rows.
    async fn prune_source(&self, source_id: &str, keep: usize) -> Result<usize>;

    async fn insert_run(&self, run: &RunLog) -> Result<()>;
    async fn finish_run(&self, run: &RunLog) -> Result<()>;

    /// The `n` most recently persisted item URLs, newest first.
    async fn recent_urls(&self, n: usize) -> Result<Vec<RecentUrl>>;
    async fn latest_run(&self) -> Result<Option<RunLog>>;
    async fn items_for_source(&self, source_id: &str) -> Result<Vec<FeedItem>>;
}

/// Item rows and their hash index. They move together, so one lock covers
/// both; upsert and prune always see (and leave) a consistent pair.
#[derive(Debug, Default)]
struct ItemTable {
    rows: Vec<FeedItem>,
    hashes: HashSet<String>,
}

/// In-memory store. The reference implementation and the test double; the
/// trait above is the seam for a database-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<ItemTable>,
    runs: Mutex<Vec<RunLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_count(&self) -> usize {
        self.table.lock().expect("item table mutex poisoned").rows.len()
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn upsert_item(&self, item: FeedItem) -> Result<UpsertOutcome> {
        let mut table = self.table.lock().expect("item table mutex poisoned");
        if !table.hashes.insert(item.content_hash.clone()) {
            return Ok(UpsertOutcome::Duplicate);
        }
        table.rows.push(item);
        Ok(UpsertOutcome::Inserted)
    }

    async fn prune_source(&self, source_id: &str, keep: usize) -> Result<usize> {
        let mut table = self.table.lock().expect("item table mutex poisoned");
        let ItemTable { rows, hashes } = &mut *table;

        let mut for_source: Vec<(usize, DateTime<Utc>)> = rows
            .iter()
            .enumerate()
            .filter(|(_, it)| it.source == source_id)
            .map(|(i, it)| (i, it.published_at))
            .collect();
        if for_source.len() <= keep {
            return Ok(0);
        }

        // newest first; everything past `keep` is deleted
        for_source.sort_by(|a, b| b.1.cmp(&a.1));
        let doomed: HashSet<usize> = for_source[keep..].iter().map(|(i, _)| *i).collect();

        let mut deleted = 0usize;
        let mut idx = 0usize;
        rows.retain(|it| {
            let keep_row = !doomed.contains(&idx);
            if !keep_row {
                hashes.remove(&it.content_hash);
                deleted += 1;
            }
            idx += 1;
            keep_row
        });
        Ok(deleted)
    }

    async fn insert_run(&self, run: &RunLog) -> Result<()> {
        self.runs
            .lock()
            .expect("runs mutex poisoned")
            .push(run.clone());
        Ok(())
    }

    async fn finish_run(&self, run: &RunLog) -> Result<()> {
        let mut runs = self.runs.lock().expect("runs mutex poisoned");
        match runs.iter_mut().find(|r| r.id == run.id) {
            Some(row) => {
                *row = run.clone();
                Ok(())
            }
            None => Err(anyhow!("run log row not found: {}", run.id)),
        }
    }

    async fn recent_urls(&self, n: usize) -> Result<Vec<RecentUrl>> {
        let table = self.table.lock().expect("item table mutex poisoned");
        Ok(table
            .rows
            .iter()
            .rev()
            .filter_map(|it| {
                it.url.as_ref().map(|u| RecentUrl {
                    url: u.clone(),
                    source: it.source.clone(),
                    published_at: it.published_at,
                })
            })
            .take(n)
            .collect())
    }

    async fn latest_run(&self) -> Result<Option<RunLog>> {
        Ok(self.runs.lock().expect("runs mutex poisoned").last().cloned())
    }

    async fn items_for_source(&self, source_id: &str) -> Result<Vec<FeedItem>> {
        let table = self.table.lock().expect("item table mutex poisoned");
        Ok(table
            .rows
            .iter()
            .filter(|it| it.source == source_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: Option<&str>, title: &str) -> CandidateItem {
        CandidateItem {
            title: title.to_string(),
            url: url.map(|s| s.to_string()),
            summary: String::new(),
            published_at: DateTime::parse_from_rfc3339("2025-08-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            tags: vec![],
            brand: "b".to_string(),
        }
    }

    #[test]
    fn identity_strips_query_and_fragment() {
        let a = candidate(Some("https://example.test/story?utm=x#top"), "t");
        let b = candidate(Some("https://example.test/story"), "t");
        assert_eq!(normalize_identity(&a), "https://example.test/story");
        assert_eq!(normalize_identity(&a), normalize_identity(&b));
    }

    #[test]
    fn identity_falls_back_to_title_and_timestamp() {
        let a = candidate(None, "A headline");
        assert_eq!(
            normalize_identity(&a),
            "A headline|2025-08-01T12:00:00+00:00"
        );
        // empty url strings behave like no url
        let b = candidate(Some("  "), "A headline");
        assert_eq!(normalize_identity(&a), normalize_identity(&b));
    }

    #[test]
    fn content_hash_is_stable_sha256_hex() {
        let h = content_hash("https://example.test/story");
        assert_eq!(h.len(), 64);
        assert_eq!(h, content_hash("https://example.test/story"));
        assert_ne!(h, content_hash("https://example.test/other"));
    }
}
