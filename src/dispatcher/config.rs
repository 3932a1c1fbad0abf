//! Dispatch configuration constants and retry policy

use std::time::Duration;

/// Maximum fetch attempts per item (initial call + retries).
/// Quota rotations and transient backoffs share this budget, so an item
/// terminates after at most 3 collaborator calls no matter how it fails.
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Initial backoff delay in milliseconds.
/// 1 second is long enough for most transient server hiccups to clear.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
/// Caps the doubling sequence at 16 seconds (1s, 2s, 4s, 8s, 16s, 16s, ...).
pub const MAX_BACKOFF_MS: u64 = 16_000;

/// Courtesy pause between an item completing and the worker claiming the
/// next index. Throttling politeness, not a correctness requirement.
pub const INTER_REQUEST_DELAY: Duration = Duration::from_millis(200);

/// Pause between sequential key validation calls so the validation endpoint
/// is not hammered.
pub const VALIDATION_DELAY: Duration = Duration::from_millis(300);

/// Result cache time-to-live. Entries older than this are treated as absent.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Minimum worker count.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum worker count. More workers than this yields no throughput against
/// a quota-limited API and multiplies the blast radius of a bad key.
pub const MAX_CONCURRENCY: usize = 30;

/// Default worker count.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Backoff delay before retrying a transient failure
///
/// Pure and deterministic: `attempt` is the number of attempts already made
/// (1-indexed), and the returned delay doubles per attempt from
/// [`INITIAL_BACKOFF_MS`] up to the [`MAX_BACKOFF_MS`] cap. Monotone
/// nondecreasing for any attempt beyond the table.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(1u64 << exponent);
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}

/// Clamp a caller-requested worker count into the supported range
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}
