// src/pipeline.rs
//! Run orchestration: registry -> fetch -> rate-limit gate -> score ->
//! threshold -> dedup/persist -> retention sweep, with a run log row
//! bracketing the whole thing.

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use uuid::Uuid;

use crate::config::CrawlerConfig;
use crate::fetch::{CandidateItem, ItemFetcher};
use crate::rate_limit::RateLimiter;
use crate::score::{passes_threshold, score_item};
use crate::sources::{Source, SourceRegistry};
use crate::store::{content_hash, normalize_identity, FeedItem, FeedStore, RunLog, UpsertOutcome};

/// One-time registration of every crawl series, so they render on /metrics
/// before the first run. Called from the recorder install and at run start.
pub(crate) fn describe_run_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("crawl_runs_total", "Total crawl runs started.");
        describe_counter!("crawl_items_fetched_total", "Candidate items fetched.");
        describe_counter!("crawl_items_new_total", "Items persisted as new.");
        describe_counter!(
            "crawl_items_skipped_total",
            "Items skipped (rate limit, low score, duplicate, error)."
        );
        describe_counter!("crawl_source_errors_total", "Per-source fetch/process errors.");
        describe_gauge!("crawl_last_run_ts", "Unix ts when the crawler last ran.");
        describe_gauge!(
            "crawl_score_threshold",
            "Minimum score to persist an item, as of the latest run."
        );
    });
}

/// Mutable per-run state, created at run start and threaded explicitly
/// through every stage. Never global, so repeated runs stay isolated.
#[derive(Debug, Default)]
struct RunContext {
    limiter: RateLimiter,
    items_fetched: u64,
    items_new: u64,
    skipped_rate_limited: u64,
    skipped_low_score: u64,
    skipped_duplicate: u64,
    skipped_error: u64,
}

impl RunContext {
    fn new() -> Self {
        Self::default()
    }

    fn items_skipped(&self) -> u64 {
        self.skipped_rate_limited
            + self.skipped_low_score
            + self.skipped_duplicate
            + self.skipped_error
    }
}

/// Success payload of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub sources_processed: usize,
    pub items_fetched: u64,
    pub items_new: u64,
    pub items_skipped: u64,
    pub score_threshold: f64,
}

/// Terminal run states. A failed run is a structured result, not a crash.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    Failed { run_id: Uuid, error: String },
}

/// Execute one end-to-end crawl run.
///
/// Per-source and per-item errors are recovered locally; only failures
/// outside that loop (source-list load, run-log creation, retention sweep,
/// final run-log update) surface as a FAILED run.
pub async fn run_crawl(
    registry: &SourceRegistry,
    fetcher: &dyn ItemFetcher,
    store: &dyn FeedStore,
    cfg: &CrawlerConfig,
) -> RunOutcome {
    describe_run_metrics();
    counter!("crawl_runs_total").increment(1);
    // Config is re-read per run, so the gauge tracks the live value.
    gauge!("crawl_score_threshold").set(cfg.score_threshold);

    let mut run = RunLog::started_now();
    if let Err(e) = store.insert_run(&run).await {
        // Can't even open the audit trail; nothing to update later.
        tracing::error!(error = ?e, run_id = %run.id, "run log creation failed");
        return RunOutcome::Failed {
            run_id: run.id,
            error: format!("run log creation failed: {e:#}"),
        };
    }

    tracing::info!(
        run_id = %run.id,
        threshold = cfg.score_threshold,
        advanced_scorer = cfg.advanced_scorer,
        fetcher = fetcher.name(),
        "crawl run started"
    );

    match execute(registry, fetcher, store, cfg, &mut run).await {
        Ok(summary) => {
            gauge!("crawl_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
            tracing::info!(
                run_id = %run.id,
                sources = summary.sources_processed,
                fetched = summary.items_fetched,
                new = summary.items_new,
                skipped = summary.items_skipped,
                "crawl run completed"
            );
            RunOutcome::Completed(summary)
        }
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(run_id = %run.id, error = %error, "crawl run failed");
            run.finished_at = Some(Utc::now());
            run.error_details = Some(error.clone());
            record_failure_log(store, &run).await;
            RunOutcome::Failed {
                run_id: run.id,
                error,
            }
        }
    }
}

async fn execute(
    registry: &SourceRegistry,
    fetcher: &dyn ItemFetcher,
    store: &dyn FeedStore,
    cfg: &CrawlerConfig,
    run: &mut RunLog,
) -> Result<RunSummary> {
    let sources = registry.merged().context("loading source list")?;
    let enabled: Vec<&Source> = sources.iter().filter(|s| s.enabled).collect();

    let mut ctx = RunContext::new();

    for source in &enabled {
        let items = match fetcher.fetch(source).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = ?e, source = %source.id, "source fetch error");
                counter!("crawl_source_errors_total").increment(1);
                continue;
            }
        };

        for item in items {
            process_item(item, source, store, cfg, &mut ctx).await;
        }
    }

    // Retention sweep runs every cycle, regardless of what this run added.
    for source in &sources {
        let deleted = store
            .prune_source(&source.id, cfg.retention_per_source)
            .await
            .with_context(|| format!("retention sweep for source {}", source.id))?;
        if deleted > 0 {
            tracing::debug!(source = %source.id, deleted, "retention sweep removed rows");
        }
    }

    counter!("crawl_items_fetched_total").increment(ctx.items_fetched);
    counter!("crawl_items_new_total").increment(ctx.items_new);
    counter!("crawl_items_skipped_total").increment(ctx.items_skipped());

    tracing::info!(
        rate_limited = ctx.skipped_rate_limited,
        low_score = ctx.skipped_low_score,
        duplicates = ctx.skipped_duplicate,
        errors = ctx.skipped_error,
        "skip breakdown"
    );

    run.finished_at = Some(Utc::now());
    run.sources_count = enabled.len();
    run.items_fetched = ctx.items_fetched;
    run.items_new = ctx.items_new;
    run.items_skipped = ctx.items_skipped();
    store.finish_run(run).await.context("updating run log")?;

    Ok(RunSummary {
        run_id: run.id,
        sources_processed: enabled.len(),
        items_fetched: ctx.items_fetched,
        items_new: ctx.items_new,
        items_skipped: ctx.items_skipped(),
        score_threshold: cfg.score_threshold,
    })
}

async fn process_item(
    item: CandidateItem,
    source: &Source,
    store: &dyn FeedStore,
    cfg: &CrawlerConfig,
    ctx: &mut RunContext,
) {
    ctx.items_fetched += 1;

    // The gate runs before scoring, so rate-limited items are tallied
    // separately from low-score ones and are never scored.
    if !ctx
        .limiter
        .can_process(source.locale, source.category(), cfg.category_limit)
    {
        ctx.skipped_rate_limited += 1;
        return;
    }

    let score = score_item(&item, source);
    if !passes_threshold(score, cfg.score_threshold) {
        ctx.skipped_low_score += 1;
        return;
    }

    let hash = content_hash(&normalize_identity(&item));
    let feed_item = promote(item, source, score, hash);

    match store.upsert_item(feed_item).await {
        Ok(UpsertOutcome::Inserted) => ctx.items_new += 1,
        Ok(UpsertOutcome::Duplicate) => ctx.skipped_duplicate += 1,
        Err(e) => {
            tracing::warn!(error = ?e, source = %source.id, "item persistence error");
            ctx.skipped_error += 1;
        }
    }
}

/// Promote an accepted candidate to a durable feed item. Source tags are
/// unioned with item tags, first-seen order kept.
fn promote(item: CandidateItem, source: &Source, score: f64, hash: String) -> FeedItem {
    let mut tags = source.tags.clone();
    for t in item.tags {
        if !tags.contains(&t) {
            tags.push(t);
        }
    }
    FeedItem {
        source: source.id.clone(),
        title: item.title,
        url: item.url,
        summary: item.summary,
        published_at: item.published_at,
        tags,
        brand: item.brand,
        locale: source.locale,
        score,
        content_hash: hash,
    }
}

/// Best-effort failure bookkeeping: a failure while recording the failure is
/// logged and swallowed so it cannot mask the original error.
async fn record_failure_log(store: &dyn FeedStore, run: &RunLog) {
    if let Err(log_err) = store.finish_run(run).await {
        tracing::warn!(error = ?log_err, run_id = %run.id, "failed to record run failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Locale;
    use chrono::Utc;

    #[test]
    fn promote_unions_tags_in_order() {
        let source = Source {
            id: "s".into(),
            locale: Locale::En,
            kind: "synthetic".into(),
            url: String::new(),
            tags: vec!["cars".into(), "news".into()],
            keywords: vec![],
            weight: 1.0,
            enabled: true,
        };
        let item = CandidateItem {
            title: "t".into(),
            url: None,
            summary: "s".into(),
            published_at: Utc::now(),
            tags: vec!["news".into(), "digest".into()],
            brand: "s".into(),
        };
        let fi = promote(item, &source, 0.8, "h".into());
        assert_eq!(fi.tags, vec!["cars", "news", "digest"]);
        assert_eq!(fi.locale, Locale::En);
        assert_eq!(fi.score, 0.8);
    }
}
