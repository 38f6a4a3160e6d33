// src/fetch/rss.rs
//! RSS fetcher: HTTP GET + XML parse. The real-crawl counterpart to the
//! synthetic generator; the pipeline only sees the `ItemFetcher` trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::fetch::{normalize_text, CandidateItem, ItemFetcher};
use crate::sources::Source;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_utc(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

/// Cap a crawl tick to a small batch, matching the synthetic fetcher.
const MAX_ITEMS_PER_TICK: usize = 2;

pub struct RssFetcher {
    client: reqwest::Client,
}

impl RssFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Parse an RSS document into candidate items for `source`.
    pub fn parse_items_from_str(source: &Source, xml: &str) -> Result<Vec<CandidateItem>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing rss xml for source {}", source.id))?;

        let mut out = Vec::new();
        for it in rss.channel.item.into_iter().take(MAX_ITEMS_PER_TICK) {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let summary = normalize_text(it.description.as_deref().unwrap_or_default());
            if title.is_empty() && summary.is_empty() {
                continue;
            }

            out.push(CandidateItem {
                title,
                url: it.link,
                summary,
                published_at: it
                    .pub_date
                    .as_deref()
                    .and_then(parse_rfc2822_to_utc)
                    .unwrap_or_else(Utc::now),
                tags: vec![],
                brand: source.id.clone(),
            });
        }
        Ok(out)
    }
}

impl Default for RssFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemFetcher for RssFetcher {
    async fn fetch(&self, source: &Source) -> Result<Vec<CandidateItem>> {
        let body = self
            .client
            .get(&source.url)
            .send()
            .await
            .with_context(|| format!("rss http get for source {}", source.id))?
            .text()
            .await
            .with_context(|| format!("rss http body for source {}", source.id))?;
        Self::parse_items_from_str(source, &body)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
