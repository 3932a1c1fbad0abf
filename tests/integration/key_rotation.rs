//! Key rotation on quota exhaustion

use super::support::*;
use channel_batch_fetcher::WorkItem;
use std::sync::Arc;

#[tokio::test]
async fn quota_hit_rotates_to_a_fresh_key_and_succeeds() {
    // Three items over two keys, single worker so the call order is exact:
    // @a leases key-a, @b leases key-b and hits quota, the retry leases
    // key-a again and succeeds, @c stays on key-a.
    let fetcher = Arc::new(MockFetcher::new().script("@b", &[Step::Quota, Step::Ok]));
    let pool = validated_pool(&["key-a", "key-b"]).await;
    let sink = RecordingSink::new();
    let d = dispatcher(fetcher.clone(), pool.clone(), memory_cache())
        .with_concurrency(1)
        .with_progress_sink(sink.clone());

    let items = vec![
        WorkItem::new(0, "@a"),
        WorkItem::new(1, "@b"),
        WorkItem::new(2, "@c"),
    ];
    let results = d.run(items).await.unwrap();

    assert!(results.iter().all(|o| o.is_success()));
    assert_eq!(pool.exhausted_count(), 1);
    assert_eq!(pool.available_count(), 1);

    let log = fetcher.call_log();
    assert_eq!(log.len(), 4);
    let quota_pos = log.iter().position(|(v, _)| v == "@b").unwrap();
    let exhausted_key = &log[quota_pos].1;
    for (value, key) in &log[quota_pos + 1..] {
        assert_ne!(key, exhausted_key, "exhausted key leased again for {value}");
    }

    assert_eq!(sink.count(|e| *e == Event::KeyExhausted(1, 1)), 1);
    assert_eq!(sink.count(|e| *e == Event::AllKeysExhausted), 0);
}

#[tokio::test]
async fn quota_retry_uses_a_different_key_under_concurrency() {
    let fetcher = Arc::new(MockFetcher::new().script("@b", &[Step::Quota, Step::Ok]));
    let pool = validated_pool(&["key-a", "key-b"]).await;
    let d = dispatcher(fetcher.clone(), pool.clone(), memory_cache()).with_concurrency(2);

    let items = vec![
        WorkItem::new(0, "@a"),
        WorkItem::new(1, "@b"),
        WorkItem::new(2, "@c"),
    ];
    let results = d.run(items).await.unwrap();

    assert!(results.iter().all(|o| o.is_success()));
    assert_eq!(pool.exhausted_count(), 1);

    // The retry for @b must carry a key other than the one that hit quota
    let b_calls: Vec<String> = fetcher
        .call_log()
        .into_iter()
        .filter(|(v, _)| v == "@b")
        .map(|(_, k)| k)
        .collect();
    assert_eq!(b_calls.len(), 2);
    assert_ne!(b_calls[0], b_calls[1]);
}

#[tokio::test]
async fn round_robin_spreads_load_across_keys() {
    let fetcher = Arc::new(MockFetcher::new());
    let pool = validated_pool(&["key-a", "key-b", "key-c"]).await;
    let d = dispatcher(fetcher.clone(), pool, memory_cache()).with_concurrency(1);

    let items: Vec<WorkItem> = (0..9)
        .map(|i| WorkItem::new(i, format!("@chan{i}")))
        .collect();
    d.run(items).await.unwrap();

    let mut per_key = std::collections::HashMap::new();
    for (_, key) in fetcher.call_log() {
        *per_key.entry(key).or_insert(0usize) += 1;
    }
    assert_eq!(per_key.len(), 3);
    assert!(per_key.values().all(|&n| n == 3), "uneven spread: {per_key:?}");
}
