// tests/retention.rs
//
// Retention bound: after the sweep no source has more than the configured
// number of rows, and the survivors are exactly the most recent ones.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;

use m1_feed_crawler::sources::Locale;
use m1_feed_crawler::store::{FeedItem, FeedStore, MemoryStore};

fn feed_item(source: &str, n: i64, published_at: DateTime<Utc>) -> FeedItem {
    FeedItem {
        source: source.to_string(),
        title: format!("{source} item {n}"),
        url: Some(format!("https://example.test/{source}/{n}")),
        summary: String::new(),
        published_at,
        tags: vec![],
        brand: source.to_string(),
        locale: Locale::En,
        score: 0.8,
        content_hash: format!("{source}-{n}"),
    }
}

#[tokio::test]
async fn sweep_keeps_exactly_the_most_recent_rows() {
    let store = MemoryStore::new();
    let base = Utc::now();

    // 120 rows inserted in random order; recency is by published_at, not by
    // insertion order
    let mut offsets: Vec<i64> = (0..120).collect();
    offsets.shuffle(&mut rand::rng());
    for n in offsets {
        store
            .upsert_item(feed_item("busy", n, base - Duration::minutes(n)))
            .await
            .unwrap();
    }

    let deleted = store.prune_source("busy", 100).await.unwrap();
    assert_eq!(deleted, 20);

    let kept = store.items_for_source("busy").await.unwrap();
    assert_eq!(kept.len(), 100);
    // survivors are offsets 0..100, the most recent by published_at
    for it in &kept {
        assert!(it.published_at > base - Duration::minutes(100));
    }
}

#[tokio::test]
async fn sweep_is_per_source() {
    let store = MemoryStore::new();
    let base = Utc::now();

    for n in 0..10 {
        store
            .upsert_item(feed_item("a", n, base - Duration::minutes(n)))
            .await
            .unwrap();
        store
            .upsert_item(feed_item("b", n, base - Duration::minutes(n)))
            .await
            .unwrap();
    }

    let deleted = store.prune_source("a", 4).await.unwrap();
    assert_eq!(deleted, 6);
    assert_eq!(store.items_for_source("a").await.unwrap().len(), 4);
    assert_eq!(
        store.items_for_source("b").await.unwrap().len(),
        10,
        "other sources untouched"
    );
}

#[tokio::test]
async fn sweep_under_the_cap_deletes_nothing() {
    let store = MemoryStore::new();
    let base = Utc::now();
    for n in 0..5 {
        store
            .upsert_item(feed_item("small", n, base - Duration::minutes(n)))
            .await
            .unwrap();
    }

    assert_eq!(store.prune_source("small", 100).await.unwrap(), 0);
    assert_eq!(store.prune_source("missing", 100).await.unwrap(), 0);
    assert_eq!(store.items_for_source("small").await.unwrap().len(), 5);
}

#[tokio::test]
async fn pruned_hashes_can_be_inserted_again() {
    // a hard delete frees the content hash for future upserts
    let store = MemoryStore::new();
    let base = Utc::now();
    for n in 0..3 {
        store
            .upsert_item(feed_item("s", n, base - Duration::minutes(n)))
            .await
            .unwrap();
    }
    store.prune_source("s", 1).await.unwrap();

    let outcome = store
        .upsert_item(feed_item("s", 2, base))
        .await
        .unwrap();
    assert_eq!(outcome, m1_feed_crawler::store::UpsertOutcome::Inserted);
}
