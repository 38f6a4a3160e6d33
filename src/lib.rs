// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod fetch;
pub mod metrics;
pub mod pipeline;
pub mod rate_limit;
pub mod score;
pub mod sources;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::CrawlerConfig;
pub use crate::pipeline::{run_crawl, RunOutcome, RunSummary};
pub use crate::sources::{merge_sources, Locale, Source, SourceRegistry};
pub use crate::store::{FeedItem, FeedStore, MemoryStore, UpsertOutcome};
