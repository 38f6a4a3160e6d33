// src/fetch/synthetic.rs
//! Deterministic sample-content fetcher.
//!
//! Stands in for a real crawl tick: fabricates one or two candidate items per
//! source out of the source's own keywords and locale vocabulary. URLs are
//! stable within a calendar day so repeated ticks exercise the dedup path.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::fetch::{CandidateItem, ItemFetcher};
use crate::score::boost_vocabulary;
use crate::sources::Source;

#[derive(Debug, Default, Clone)]
pub struct SyntheticFetcher;

impl SyntheticFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ItemFetcher for SyntheticFetcher {
    async fn fetch(&self, source: &Source) -> Result<Vec<CandidateItem>> {
        let now = Utc::now();
        let day = now.format("%Y%m%d");
        let boost = boost_vocabulary(source.locale)
            .first()
            .copied()
            .unwrap_or("exclusive");

        let kw1 = source.keywords.first().map(String::as_str).unwrap_or("mission");
        let mut items = vec![CandidateItem {
            title: format!("{kw1} spotlight: a new {boost} reveal"),
            url: Some(format!("https://feeds.m1ssion.app/{}/{}/1", source.id, day)),
            summary: format!(
                "Fresh {} coverage from {}, featuring {} highlights for the hunt.",
                kw1,
                source.id,
                boost
            ),
            published_at: now,
            tags: vec![],
            brand: source.id.clone(),
        }];

        if let Some(kw2) = source.keywords.get(1) {
            items.push(CandidateItem {
                title: format!("{kw2} roundup: what collectors watch this week"),
                url: Some(format!("https://feeds.m1ssion.app/{}/{}/2", source.id, day)),
                summary: format!("A short {kw2} digest with {boost} picks and {kw1} notes."),
                published_at: now - Duration::hours(1),
                tags: vec!["digest".to_string()],
                brand: source.id.clone(),
            });
        }

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
