//! Batch dispatch orchestration
//!
//! This module is the coordination core: a fixed-size pool of workers jointly
//! processes an ordered item list exactly once each, sharing the key pool and
//! result cache, and produces a fully populated, index-aligned results array.
//!
//! # Overview
//!
//! 1. **Submission**: build a [`BatchDispatcher`] over a fetcher, key pool,
//!    and cache, then call [`BatchDispatcher::run`] with the items
//! 2. **Claiming**: workers claim indices off a shared atomic counter
//! 3. **Per-item protocol**: resolve -> cache lookup -> key lease -> fetch ->
//!    classify -> record (see [`worker`])
//! 4. **Retry**: transient failures back off per [`config::backoff_delay`];
//!    quota signals rotate to a fresh key; both share one attempt budget
//! 5. **Progress**: events stream through a [`progress::ProgressSink`]
//! 6. **Cancellation**: a shared [`crate::CancelToken`] stops new claims;
//!    in-flight fetches finish and write their results
//!
//! # Error Handling
//!
//! Per-item failures never abort the batch; they are recorded as typed
//! [`crate::ItemOutcome::Error`] values in the item's slot. Only two
//! conditions are batch-level: zero valid keys at submission
//! ([`DispatchError::NoValidKeys`]) and total key exhaustion mid-run, which
//! cancels remaining claims cooperatively.

pub mod config;
pub mod progress;
pub mod worker;

pub use progress::{LogSink, NoopSink, ProgressSink};
pub use worker::BatchDispatcher;

/// Batch-level dispatch errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No key survived validation; the batch cannot start
    #[error("no valid API keys available; cannot start batch")]
    NoValidKeys,

    /// A worker task failed to join (panic or runtime shutdown)
    #[error("worker failed: {0}")]
    WorkerFailed(String),
}
