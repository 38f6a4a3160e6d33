// src/fetch/mod.rs
pub mod rss;
pub mod synthetic;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::sources::Source;

/// An unscored, unpersisted content record produced by a fetcher.
/// Lives for one run: scored, then promoted to a `FeedItem` or discarded.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct CandidateItem {
    pub title: String,
    pub url: Option<String>,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Attribution string; defaults to the source id.
    pub brand: String,
}

#[async_trait::async_trait]
pub trait ItemFetcher: Send + Sync {
    /// Produce a small batch of candidate items for one enabled source.
    /// Errors are isolated per source by the orchestrator.
    async fn fetch(&self, source: &Source) -> Result<Vec<CandidateItem>>;
    fn name(&self) -> &'static str;
}

static TAG_RE: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
static WS_RE: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| regex::Regex::new(r"\s+").unwrap());

/// Longest title/summary carried downstream. Feed descriptions can embed
/// whole article bodies; the scorer only needs the lead.
const MAX_TEXT_CHARS: usize = 600;

/// Clean feed-supplied text before scoring: entities decoded, markup
/// stripped, curly quotes flattened to ASCII so keyword matching sees one
/// form, whitespace collapsed, trailing sentence punctuation dropped.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let stripped = TAG_RE.replace_all(&decoded, "");
    let ascii_quotes = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let mut out = WS_RE.replace_all(&ascii_quotes, " ").trim().to_string();

    while matches!(out.chars().last(), Some('!' | '?' | '.' | ',')) {
        out.pop();
    }

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}
