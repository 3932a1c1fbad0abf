//! Progress event sink
//!
//! Workers report per-item and aggregate events through an abstract sink so
//! the core makes no assumption about delivery thread or UI. Implementations
//! must tolerate invocation from any worker context; calls are fire-and-forget
//! but each individual event is delivered exactly once. Event interleaving
//! across workers is unspecified - consumers should treat the cumulative
//! counts in [`ProgressSink::on_progress`] as authoritative, not call order.

use crate::ItemOutcome;
use tracing::{info, warn};

/// Sink for batch progress events
///
/// All methods have no-op defaults so implementors can pick the events they
/// care about.
pub trait ProgressSink: Send + Sync {
    /// A worker claimed item `index` and is starting on it
    fn on_item_start(&self, _index: usize) {}

    /// Item `index` received its terminal outcome
    fn on_item_complete(&self, _index: usize, _outcome: &ItemOutcome) {}

    /// Aggregate progress after an item completed; counts are cumulative
    fn on_progress(&self, _success_count: usize, _error_count: usize, _total: usize) {}

    /// A key was rotated out after a quota signal
    fn on_key_exhausted(&self, _exhausted_count: usize, _remaining_count: usize) {}

    /// Every key is exhausted; the batch is being cancelled
    fn on_all_keys_exhausted(&self) {}
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {}

/// Sink that surfaces events as structured tracing logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_item_complete(&self, index: usize, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Success { info, from_cache } => {
                info!(
                    index = index,
                    channel_id = %info.channel_id,
                    from_cache = from_cache,
                    "Item complete"
                );
            }
            ItemOutcome::Error { kind, message } => {
                warn!(index = index, kind = %kind, error = %message, "Item failed");
            }
        }
    }

    fn on_progress(&self, success_count: usize, error_count: usize, total: usize) {
        info!(
            done = success_count + error_count,
            success = success_count,
            errors = error_count,
            total = total,
            "Batch progress"
        );
    }

    fn on_key_exhausted(&self, exhausted_count: usize, remaining_count: usize) {
        warn!(
            exhausted = exhausted_count,
            remaining = remaining_count,
            "API key exhausted; rotated out"
        );
    }

    fn on_all_keys_exhausted(&self) {
        warn!("All API keys exhausted; cancelling remaining work");
    }
}
