// tests/store_dedup.rs
//
// Deduplication semantics of the store: idempotent upserts keyed by the
// content hash of the normalized identity.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use m1_feed_crawler::fetch::CandidateItem;
use m1_feed_crawler::sources::Locale;
use m1_feed_crawler::store::{
    content_hash, normalize_identity, FeedItem, FeedStore, MemoryStore, UpsertOutcome,
};

fn feed_item(url: Option<&str>, title: &str) -> FeedItem {
    let candidate = CandidateItem {
        title: title.to_string(),
        url: url.map(|s| s.to_string()),
        summary: "s".to_string(),
        published_at: Utc::now(),
        tags: vec![],
        brand: "b".to_string(),
    };
    let hash = content_hash(&normalize_identity(&candidate));
    FeedItem {
        source: "src".to_string(),
        title: candidate.title,
        url: candidate.url,
        summary: candidate.summary,
        published_at: candidate.published_at,
        tags: vec![],
        brand: candidate.brand,
        locale: Locale::En,
        score: 0.9,
        content_hash: hash,
    }
}

#[tokio::test]
async fn second_upsert_is_a_duplicate_not_an_error() {
    let store = MemoryStore::new();
    let item = feed_item(Some("https://example.test/story"), "t");

    assert_eq!(
        store.upsert_item(item.clone()).await.unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        store.upsert_item(item).await.unwrap(),
        UpsertOutcome::Duplicate
    );
    assert_eq!(store.item_count(), 1, "at most one row per content hash");
}

#[tokio::test]
async fn tracking_params_do_not_defeat_dedup() {
    let store = MemoryStore::new();
    let a = feed_item(Some("https://example.test/story"), "t");
    let b = feed_item(Some("https://example.test/story?utm_campaign=x#frag"), "t");
    assert_eq!(a.content_hash, b.content_hash);

    assert_eq!(
        store.upsert_item(a).await.unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        store.upsert_item(b).await.unwrap(),
        UpsertOutcome::Duplicate
    );
}

#[tokio::test]
async fn urlless_items_dedup_on_title_and_timestamp() {
    let store = MemoryStore::new();
    let ts = Utc::now();

    let mk = |title: &str| {
        let candidate = CandidateItem {
            title: title.to_string(),
            url: None,
            summary: String::new(),
            published_at: ts,
            tags: vec![],
            brand: "b".to_string(),
        };
        let hash = content_hash(&normalize_identity(&candidate));
        FeedItem {
            source: "src".to_string(),
            title: candidate.title,
            url: None,
            summary: String::new(),
            published_at: ts,
            tags: vec![],
            brand: "b".to_string(),
            locale: Locale::En,
            score: 0.9,
            content_hash: hash,
        }
    };

    assert_eq!(
        store.upsert_item(mk("same headline")).await.unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        store.upsert_item(mk("same headline")).await.unwrap(),
        UpsertOutcome::Duplicate
    );
    assert_eq!(
        store.upsert_item(mk("другой headline")).await.unwrap(),
        UpsertOutcome::Inserted
    );
}

#[tokio::test]
async fn recent_urls_are_newest_first_and_capped() {
    let store = MemoryStore::new();
    for i in 0..12 {
        store
            .upsert_item(feed_item(
                Some(&format!("https://example.test/{i}")),
                &format!("t{i}"),
            ))
            .await
            .unwrap();
    }

    let recent = store.recent_urls(10).await.unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0].url, "https://example.test/11");
    assert_eq!(recent[9].url, "https://example.test/2");
    assert_eq!(recent[0].source, "src");
}

// The store is shared behind an Arc by the HTTP layer, so upserts and
// retention prunes can race across runs. Both must make progress together.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_and_prunes_complete() {
    let store = Arc::new(MemoryStore::new());

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..400 {
                let item = feed_item(Some(&format!("https://example.test/race/{i}")), "t");
                store.upsert_item(item).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };
    let pruner = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for _ in 0..400 {
                store.prune_source("src", 10).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    tokio::time::timeout(Duration::from_secs(10), async {
        writer.await.unwrap();
        pruner.await.unwrap();
    })
    .await
    .expect("concurrent upsert/prune stalled");

    store.prune_source("src", 10).await.unwrap();
    assert!(store.item_count() <= 10);
}
