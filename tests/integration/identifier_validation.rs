//! End-to-end input resolution through the dispatcher

use super::support::*;
use channel_batch_fetcher::identifier::{ChannelRef, RefKind};
use channel_batch_fetcher::{ItemErrorKind, ItemOutcome, WorkItem};
use std::sync::Arc;

#[tokio::test]
async fn mixed_input_forms_resolve_or_fail_per_item() {
    let fetcher = Arc::new(MockFetcher::new());
    let pool = validated_pool(&["key-a"]).await;
    let d = dispatcher(fetcher.clone(), pool, memory_cache()).with_concurrency(1);

    let items = vec![
        WorkItem::new(0, "https://www.youtube.com/@handle"),
        WorkItem::new(1, "UC1234567890abcdefghijkl"),
        WorkItem::new(2, "https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
        WorkItem::new(3, "https://example.com/not-youtube"),
        WorkItem::new(4, "https://youtube.com/user/legacyname"),
    ];
    let results = d.run(items).await.unwrap();

    assert!(results[0].is_success());
    assert!(results[1].is_success());
    assert!(results[2].is_success());
    assert_eq!(results[3].error_kind(), Some(ItemErrorKind::InvalidInput));
    assert!(results[4].is_success());

    // The unresolvable line never reached the collaborator
    assert_eq!(fetcher.call_count(), 4);
}

#[tokio::test]
async fn error_messages_carry_the_offending_input() {
    let fetcher = Arc::new(MockFetcher::new());
    let pool = validated_pool(&["key-a"]).await;
    let d = dispatcher(fetcher, pool, memory_cache());

    let results = d
        .run(vec![WorkItem::new(0, "https://vimeo.com/somebody")])
        .await
        .unwrap();

    match &results[0] {
        ItemOutcome::Error { message, .. } => {
            assert!(message.contains("vimeo.com"), "message: {message}");
        }
        other => panic!("expected resolution failure, got {other:?}"),
    }
}

#[test]
fn resolved_kinds_match_url_shapes() {
    let cases = [
        ("https://www.youtube.com/channel/UCabcdefgh1234567890ABCD", RefKind::ChannelId),
        ("@bare", RefKind::Handle),
        ("https://m.youtube.com/@mobile", RefKind::Handle),
        ("https://youtube.com/user/oldname", RefKind::Username),
        ("https://youtu.be/dQw4w9WgXcQ", RefKind::Video),
        ("https://www.youtube.com/shorts/abc123def45", RefKind::Video),
    ];
    for (input, kind) in cases {
        let r = ChannelRef::parse(input).unwrap();
        assert_eq!(r.kind(), kind, "input: {input}");
    }
}
