// src/config.rs
//! Run configuration, read from the environment once per run.

// --- env defaults & names ---
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.72;
pub const DEFAULT_CATEGORY_LIMIT: u32 = 3;
pub const DEFAULT_RETENTION_PER_SOURCE: usize = 100;

pub const ENV_SCORE_THRESHOLD: &str = "CRAWLER_SCORE_THRESHOLD";
pub const ENV_CATEGORY_LIMIT: &str = "CRAWLER_CATEGORY_LIMIT";
pub const ENV_RETENTION_PER_SOURCE: &str = "CRAWLER_RETENTION_PER_SOURCE";
pub const ENV_ADVANCED_SCORER: &str = "CRAWLER_ADVANCED_SCORER";

/// Tunables for a single crawl run.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Minimum relevance score an item must reach to be persisted.
    pub score_threshold: f64,
    /// Max items admitted per (locale, category) key per run.
    pub category_limit: u32,
    /// Rows kept per source by the retention sweep.
    pub retention_per_source: usize,
    /// Advisory flag selecting the scoring strategy. Only the keyword
    /// scorer exists today, so this gates nothing yet.
    pub advanced_scorer: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            category_limit: DEFAULT_CATEGORY_LIMIT,
            retention_per_source: DEFAULT_RETENTION_PER_SOURCE,
            advanced_scorer: false,
        }
    }
}

impl CrawlerConfig {
    /// Build a config from the environment, falling back to defaults on
    /// missing or unparsable values.
    pub fn from_env() -> Self {
        Self {
            score_threshold: parse_threshold_env(std::env::var(ENV_SCORE_THRESHOLD).ok())
                .unwrap_or(DEFAULT_SCORE_THRESHOLD),
            category_limit: std::env::var(ENV_CATEGORY_LIMIT)
                .ok()
                .and_then(|s| s.trim().parse::<u32>().ok())
                .unwrap_or(DEFAULT_CATEGORY_LIMIT),
            retention_per_source: std::env::var(ENV_RETENTION_PER_SOURCE)
                .ok()
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(DEFAULT_RETENTION_PER_SOURCE),
            advanced_scorer: std::env::var(ENV_ADVANCED_SCORER)
                .ok()
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_parsing_clamps() {
        assert_eq!(parse_threshold_env(Some("0.5".into())), Some(0.5));
        assert_eq!(parse_threshold_env(Some(" 1.7 ".into())), Some(1.0));
        assert_eq!(parse_threshold_env(Some("-0.3".into())), Some(0.0));
        assert_eq!(parse_threshold_env(Some("abc".into())), None);
        assert_eq!(parse_threshold_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn from_env_uses_defaults_when_unset() {
        std::env::remove_var(ENV_SCORE_THRESHOLD);
        std::env::remove_var(ENV_CATEGORY_LIMIT);
        std::env::remove_var(ENV_RETENTION_PER_SOURCE);
        std::env::remove_var(ENV_ADVANCED_SCORER);

        let cfg = CrawlerConfig::from_env();
        assert_eq!(cfg.score_threshold, DEFAULT_SCORE_THRESHOLD);
        assert_eq!(cfg.category_limit, DEFAULT_CATEGORY_LIMIT);
        assert_eq!(cfg.retention_per_source, DEFAULT_RETENTION_PER_SOURCE);
        assert!(!cfg.advanced_scorer);
    }

    #[serial_test::serial]
    #[test]
    fn from_env_reads_overrides() {
        std::env::set_var(ENV_SCORE_THRESHOLD, "0.5");
        std::env::set_var(ENV_CATEGORY_LIMIT, "7");
        std::env::set_var(ENV_RETENTION_PER_SOURCE, "42");
        std::env::set_var(ENV_ADVANCED_SCORER, "true");

        let cfg = CrawlerConfig::from_env();
        assert_eq!(cfg.score_threshold, 0.5);
        assert_eq!(cfg.category_limit, 7);
        assert_eq!(cfg.retention_per_source, 42);
        assert!(cfg.advanced_scorer);

        std::env::remove_var(ENV_SCORE_THRESHOLD);
        std::env::remove_var(ENV_CATEGORY_LIMIT);
        std::env::remove_var(ENV_RETENTION_PER_SOURCE);
        std::env::remove_var(ENV_ADVANCED_SCORER);
    }
}
