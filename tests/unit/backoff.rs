//! Tests for backoff and concurrency configuration

use channel_batch_fetcher::dispatcher::config::{
    backoff_delay, clamp_concurrency, DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY,
};
use std::time::Duration;

#[test]
fn test_backoff_doubles_from_one_second() {
    assert_eq!(backoff_delay(1), Duration::from_secs(1));
    assert_eq!(backoff_delay(2), Duration::from_secs(2));
    assert_eq!(backoff_delay(3), Duration::from_secs(4));
    assert_eq!(backoff_delay(4), Duration::from_secs(8));
    assert_eq!(backoff_delay(5), Duration::from_secs(16));
}

#[test]
fn test_backoff_is_capped() {
    assert_eq!(backoff_delay(6), Duration::from_secs(16));
    assert_eq!(backoff_delay(40), Duration::from_secs(16));
}

#[test]
fn test_concurrency_is_clamped_to_supported_range() {
    assert_eq!(clamp_concurrency(0), MIN_CONCURRENCY);
    assert_eq!(clamp_concurrency(4), DEFAULT_CONCURRENCY);
    assert_eq!(clamp_concurrency(30), MAX_CONCURRENCY);
    assert_eq!(clamp_concurrency(1000), MAX_CONCURRENCY);
}
