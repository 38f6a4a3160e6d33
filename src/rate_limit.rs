// src/rate_limit.rs
//! Per-run admission counters keyed by (locale, category).
//! In-memory only; a fresh limiter is built at the start of every run.

use std::collections::HashMap;

use crate::sources::Locale;

#[derive(Debug, Default)]
pub struct RateLimiter {
    counts: HashMap<(Locale, String), u32>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True (and counted) while fewer than `limit` items were admitted for
    /// this (locale, category) key; false with no increment otherwise.
    /// Consulted before scoring, so limited items are never scored.
    pub fn can_process(&mut self, locale: Locale, category: &str, limit: u32) -> bool {
        let count = self
            .counts
            .entry((locale, category.to_string()))
            .or_insert(0);
        if *count < limit {
            *count += 1;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    fn count_for(&self, locale: Locale, category: &str) -> u32 {
        self.counts
            .get(&(locale, category.to_string()))
            .copied()
            .unwrap_or(0)
    }
}
