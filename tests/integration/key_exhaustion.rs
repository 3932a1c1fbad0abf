//! Total key exhaustion: batch stops early but every item gets an outcome

use super::support::*;
use channel_batch_fetcher::{ItemErrorKind, WorkItem};
use std::sync::Arc;

fn quota_everything(n: usize) -> (Arc<MockFetcher>, Vec<WorkItem>) {
    let mut fetcher = MockFetcher::new();
    let mut items = Vec::with_capacity(n);
    for i in 0..n {
        let value = format!("@chan{i}");
        fetcher = fetcher.script(&value, &[Step::Quota]);
        items.push(WorkItem::new(i, value));
    }
    (Arc::new(fetcher), items)
}

#[tokio::test]
async fn exhausting_the_last_key_stops_the_batch_without_missing_items() {
    let (fetcher, items) = quota_everything(5);
    let pool = validated_pool(&["only-key"]).await;
    let sink = RecordingSink::new();
    let d = dispatcher(fetcher.clone(), pool.clone(), memory_cache())
        .with_concurrency(2)
        .with_progress_sink(sink.clone());

    let results = d.run(items).await.unwrap();

    // The run itself is not an error; exhaustion surfaces per item
    assert_eq!(results.len(), 5);
    for (i, outcome) in results.iter().enumerate() {
        assert_eq!(
            outcome.error_kind(),
            Some(ItemErrorKind::NoAvailableKeys),
            "item {i}: {outcome:?}"
        );
    }

    assert!(!pool.has_available());
    assert_eq!(sink.count(|e| *e == Event::AllKeysExhausted), 1);
    // At most both in-flight workers reached the collaborator before the
    // pool emptied; cancellation prevents the rest
    assert!(fetcher.call_count() <= 2, "calls={}", fetcher.call_count());
}

#[tokio::test]
async fn earlier_successes_survive_late_exhaustion() {
    let fetcher = Arc::new(MockFetcher::new().script("@c", &[Step::Quota]));
    let pool = validated_pool(&["only-key"]).await;
    let sink = RecordingSink::new();
    let d = dispatcher(fetcher, pool, memory_cache())
        .with_concurrency(1)
        .with_progress_sink(sink.clone());

    let items = vec![
        WorkItem::new(0, "@a"),
        WorkItem::new(1, "@b"),
        WorkItem::new(2, "@c"),
        WorkItem::new(3, "@d"),
    ];
    let results = d.run(items).await.unwrap();

    assert!(results[0].is_success());
    assert!(results[1].is_success());
    assert_eq!(results[2].error_kind(), Some(ItemErrorKind::NoAvailableKeys));
    assert_eq!(results[3].error_kind(), Some(ItemErrorKind::NoAvailableKeys));
    assert_eq!(sink.count(|e| *e == Event::AllKeysExhausted), 1);
}
