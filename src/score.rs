// src/score.rs
//! Relevance scoring: keyword overlap against the source's keyword set,
//! scaled by source weight and a locale vocabulary boost, clamped to [0, 1].
//!
//! Pure functions only; the acceptance threshold is applied by the caller so
//! a rejected item is a counted discard, not a scoring concern.

use crate::fetch::CandidateItem;
use crate::sources::{Locale, Source};

/// Multiplier applied when the text mentions any locale vocabulary term.
pub const LANGUAGE_BOOST: f64 = 1.2;

/// Baseline for keyword-less sources so they are not automatically zeroed.
const NEUTRAL_BASE: f64 = 0.5;

/// Per-locale vocabulary that triggers the language boost:
/// luxury / premium / exclusive / limited / mission and translations.
pub fn boost_vocabulary(locale: Locale) -> &'static [&'static str] {
    match locale {
        Locale::En => &["luxury", "premium", "exclusive", "limited", "mission"],
        Locale::Fr => &["luxe", "premium", "exclusif", "exclusive", "limitée", "mission"],
        Locale::Es => &["lujo", "premium", "exclusivo", "exclusiva", "limitado", "misión"],
        Locale::De => &["luxus", "premium", "exklusiv", "limitiert", "mission"],
        Locale::Nl => &["luxe", "premium", "exclusief", "gelimiteerd", "missie"],
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Score one candidate item against its source. Returns a value in [0, 1]
/// rounded to 2 decimals. Pure; safe to call for items later discarded.
pub fn score_item(item: &CandidateItem, source: &Source) -> f64 {
    if source.keywords.is_empty() {
        return round2((NEUTRAL_BASE * source.weight).clamp(0.0, 1.0));
    }

    let text = format!("{} {}", item.title, item.summary).to_lowercase();

    let mut matches = 0.0_f64;
    for keyword in &source.keywords {
        let kw = keyword.to_lowercase();
        if text.contains(&kw) {
            matches += 1.0;
            continue;
        }
        // Multi-word phrase: half credit when at least 50% of its tokens
        // appear individually.
        let tokens: Vec<&str> = kw.split_whitespace().collect();
        if tokens.len() > 1 {
            let present = tokens.iter().filter(|t| text.contains(*t)).count();
            if present * 2 >= tokens.len() {
                matches += 0.5;
            }
        }
    }

    let base_score = matches / source.keywords.len() as f64;

    let boost = if boost_vocabulary(source.locale)
        .iter()
        .any(|term| text.contains(term))
    {
        LANGUAGE_BOOST
    } else {
        1.0
    };

    round2((base_score * source.weight * boost).clamp(0.0, 1.0))
}

/// Threshold predicate. Pure, so filtering twice yields the same decision.
pub fn passes_threshold(score: f64, threshold: f64) -> bool {
    score >= threshold
}
