// src/sources.rs
//! # Source registry
//!
//! Configured content origins for the feed crawler: a built-in curated list
//! merged with a dynamic list loaded from a TOML/JSON file. Merging is pure
//! and last-write-wins on duplicate ids; `enabled` filtering is the caller's
//! job at fetch time so the merge output stays complete.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SOURCES_PATH: &str = "CRAWLER_SOURCES_PATH";

/// Supported content locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Fr,
    Es,
    De,
    Nl,
}

impl Locale {
    pub const ALL: [Locale; 5] = [Locale::En, Locale::Fr, Locale::Es, Locale::De, Locale::Nl];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
            Locale::Es => "es",
            Locale::De => "de",
            Locale::Nl => "nl",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured content origin. Read-only during a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: String,
    pub locale: Locale,
    /// Fetch strategy tag ("rss", "api", "synthetic", ...). Informational.
    #[serde(default)]
    pub kind: String,
    /// Origin endpoint. Unused by the synthetic fetcher but part of the contract.
    #[serde(default)]
    pub url: String,
    /// Category labels attached to every item from this source.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Relevance terms; may be multi-word phrases.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

impl Source {
    /// Rate-limit category: the first tag, or "general" when untagged.
    pub fn category(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("general")
    }
}

/// Merge source lists into one flat list. Duplicate `id`s resolve
/// last-write-wins: later lists take precedence. First-seen ordering is
/// preserved so the output is deterministic.
pub fn merge_sources(lists: &[Vec<Source>]) -> Vec<Source> {
    let mut merged: Vec<Source> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for src in list {
            match index.get(&src.id).copied() {
                Some(i) => merged[i] = src.clone(),
                None => {
                    index.insert(src.id.clone(), merged.len());
                    merged.push(src.clone());
                }
            }
        }
    }
    merged
}

/// Built-in curated seed covering all supported locales.
/// Used even when no dynamic source file is configured.
pub fn curated_sources() -> Vec<Source> {
    let mk = |id: &str, locale: Locale, tags: &[&str], keywords: &[&str], weight: f64| Source {
        id: id.to_string(),
        locale,
        kind: "synthetic".to_string(),
        url: String::new(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        weight,
        enabled: true,
    };

    vec![
        mk(
            "luxury-cars-en",
            Locale::En,
            &["cars"],
            &["Ferrari", "luxury", "supercar"],
            1.2,
        ),
        mk(
            "watches-en",
            Locale::En,
            &["watches"],
            &["Rolex", "chronograph", "limited edition"],
            1.1,
        ),
        mk(
            "tech-drops-en",
            Locale::En,
            &["tech"],
            &["gadget", "launch", "exclusive preview"],
            1.0,
        ),
        mk(
            "voitures-fr",
            Locale::Fr,
            &["cars"],
            &["Bugatti", "luxe", "supercar"],
            1.1,
        ),
        mk(
            "montres-fr",
            Locale::Fr,
            &["watches"],
            &["montre", "édition limitée", "exclusif"],
            1.0,
        ),
        mk(
            "coches-es",
            Locale::Es,
            &["cars"],
            &["Lamborghini", "lujo", "superdeportivo"],
            1.1,
        ),
        mk(
            "autos-de",
            Locale::De,
            &["cars"],
            &["Porsche", "Luxus", "Sportwagen"],
            1.1,
        ),
        mk(
            "horloges-nl",
            Locale::Nl,
            &["watches"],
            &["horloge", "luxe", "gelimiteerd"],
            1.0,
        ),
    ]
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    #[derive(Deserialize)]
    struct TomlRoot {
        sources: Vec<Source>,
    }

    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(root) = toml::from_str::<TomlRoot>(s) {
            return Ok(root.sources);
        }
    }
    // Try JSON array
    if let Ok(v) = serde_json::from_str::<Vec<Source>>(s) {
        return Ok(v);
    }
    // Fallback: also try TOML if not attempted
    if !try_toml {
        if let Ok(root) = toml::from_str::<TomlRoot>(s) {
            return Ok(root.sources);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

/// Load dynamic sources from an explicit path. Supports TOML or JSON.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources from {}", path.display()))
}

/// Load dynamic sources using env var + fallbacks:
/// 1) $CRAWLER_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// A missing file is not an error; it yields an empty list.
pub fn load_dynamic_sources() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("CRAWLER_SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

/// Where a run gets its merged source list from.
#[derive(Debug, Clone)]
pub enum SourceRegistry {
    /// Curated seed merged with the dynamic file (env/fallback paths).
    FromEnv,
    /// Fixed list, for tests and embedding.
    Fixed(Vec<Source>),
}

impl SourceRegistry {
    /// Produce the merged source list. Dynamic sources win on id conflicts.
    pub fn merged(&self) -> Result<Vec<Source>> {
        match self {
            SourceRegistry::FromEnv => {
                let dynamic = load_dynamic_sources()?;
                Ok(merge_sources(&[curated_sources(), dynamic]))
            }
            SourceRegistry::Fixed(list) => Ok(list.clone()),
        }
    }
}
