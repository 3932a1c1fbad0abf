//! Worker pool and per-item fetch protocol

use crate::cache::ResultCache;
use crate::cancel::{CancelToken, SharedCancel};
use crate::dispatcher::config::{
    backoff_delay, clamp_concurrency, DEFAULT_CONCURRENCY, INTER_REQUEST_DELAY, MAX_FETCH_ATTEMPTS,
};
use crate::dispatcher::progress::{NoopSink, ProgressSink};
use crate::dispatcher::DispatchError;
use crate::fetcher::{ChannelFetcher, FetchErrorKind};
use crate::identifier::ChannelRef;
use crate::keypool::KeyPool;
use crate::{ItemErrorKind, ItemOutcome, WorkItem};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Orchestrates one batch: N workers jointly processing an ordered item list
/// exactly once each
///
/// Construction is builder-style; `run` may be called repeatedly with fresh
/// item lists against the same pool and cache.
pub struct BatchDispatcher {
    fetcher: Arc<dyn ChannelFetcher>,
    key_pool: Arc<KeyPool>,
    cache: Arc<ResultCache>,
    sink: Arc<dyn ProgressSink>,
    cancel: SharedCancel,
    concurrency: usize,
    max_attempts: u32,
    inter_request_delay: Duration,
}

impl BatchDispatcher {
    /// Create a dispatcher with default concurrency and a no-op progress sink
    pub fn new(
        fetcher: Arc<dyn ChannelFetcher>,
        key_pool: Arc<KeyPool>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            fetcher,
            key_pool,
            cache,
            sink: Arc::new(NoopSink),
            cancel: CancelToken::shared(),
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: MAX_FETCH_ATTEMPTS,
            inter_request_delay: INTER_REQUEST_DELAY,
        }
    }

    /// Set the worker count, clamped to the supported 1-30 range
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = clamp_concurrency(concurrency);
        self
    }

    /// Attach a progress event sink
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Attach an external cancellation token (e.g., wired to Ctrl+C)
    pub fn with_cancel_token(mut self, cancel: SharedCancel) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override the per-item attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the courtesy pause between items (tests set this to zero)
    pub fn with_inter_request_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    /// Process `items` to completion or cancellation
    ///
    /// Returns one terminal [`ItemOutcome`] per submitted item, in original
    /// submission order regardless of completion order. Slots left unclaimed
    /// by cancellation are filled with a terminal error before returning, so
    /// no item is ever silently missing.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoValidKeys`] if the pool has no leasable key at
    /// submission time.
    pub async fn run(&self, items: Vec<WorkItem>) -> Result<Vec<ItemOutcome>, DispatchError> {
        if !self.key_pool.has_available() {
            return Err(DispatchError::NoValidKeys);
        }

        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let span = tracing::info_span!("batch_run", items = total, workers = self.concurrency);
        let _enter = span.enter();
        info!(
            keys = self.key_pool.available_count(),
            "Starting batch dispatch"
        );

        let shared = Arc::new(Shared {
            items,
            fetcher: self.fetcher.clone(),
            key_pool: self.key_pool.clone(),
            cache: self.cache.clone(),
            sink: self.sink.clone(),
            cancel: self.cancel.clone(),
            next_index: AtomicUsize::new(0),
            results: Mutex::new(vec![None; total]),
            success_count: AtomicUsize::new(0),
            error_count: AtomicUsize::new(0),
            exhaustion_reported: AtomicBool::new(false),
            max_attempts: self.max_attempts,
            inter_request_delay: self.inter_request_delay,
        });

        let worker_count = self.concurrency.min(total);
        let mut handles = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(shared, worker_id).await;
            }));
        }

        for joined in futures_util::future::join_all(handles).await {
            joined.map_err(|e| DispatchError::WorkerFailed(e.to_string()))?;
        }

        // Slots never claimed (cancellation hit before a worker got there)
        // still get a terminal result: key exhaustion maps to
        // NoAvailableKeys, an external stop to Cancelled.
        let fill_kind = if self.key_pool.has_available() {
            ItemErrorKind::Cancelled
        } else {
            ItemErrorKind::NoAvailableKeys
        };
        let mut slots = shared
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let results: Vec<ItemOutcome> = slots
            .drain(..)
            .map(|slot| {
                slot.unwrap_or_else(|| ItemOutcome::Error {
                    kind: fill_kind,
                    message: "batch cancelled before item was processed".to_string(),
                })
            })
            .collect();

        info!(
            success = shared.success_count.load(Ordering::SeqCst),
            errors = total - shared.success_count.load(Ordering::SeqCst),
            "Batch dispatch complete"
        );
        Ok(results)
    }
}

/// State shared by every worker of one batch
struct Shared {
    items: Vec<WorkItem>,
    fetcher: Arc<dyn ChannelFetcher>,
    key_pool: Arc<KeyPool>,
    cache: Arc<ResultCache>,
    sink: Arc<dyn ProgressSink>,
    cancel: SharedCancel,
    /// Sole synchronization point for claiming work; fetch_add only
    next_index: AtomicUsize,
    /// One slot per item, each written exactly once by its claiming worker
    results: Mutex<Vec<Option<ItemOutcome>>>,
    success_count: AtomicUsize,
    error_count: AtomicUsize,
    exhaustion_reported: AtomicBool,
    max_attempts: u32,
    inter_request_delay: Duration,
}

async fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    debug!(worker = worker_id, "Worker started");

    loop {
        // Cancellation stops new claims; the current item, once claimed,
        // always runs to a terminal outcome
        if shared.cancel.is_cancelled() {
            break;
        }

        let index = shared.next_index.fetch_add(1, Ordering::SeqCst);
        if index >= shared.items.len() {
            break;
        }

        shared.sink.on_item_start(index);
        let outcome = process_item(&shared, &shared.items[index]).await;

        let (success, errors) = match &outcome {
            ItemOutcome::Success { .. } => (
                shared.success_count.fetch_add(1, Ordering::SeqCst) + 1,
                shared.error_count.load(Ordering::SeqCst),
            ),
            ItemOutcome::Error { .. } => (
                shared.success_count.load(Ordering::SeqCst),
                shared.error_count.fetch_add(1, Ordering::SeqCst) + 1,
            ),
        };

        {
            let mut slots = shared
                .results
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            slots[index] = Some(outcome.clone());
        }
        shared.sink.on_item_complete(index, &outcome);

        if !shared.key_pool.has_available()
            && !shared.exhaustion_reported.swap(true, Ordering::SeqCst)
        {
            warn!(worker = worker_id, "Key pool empty; cancelling batch");
            shared.sink.on_all_keys_exhausted();
            shared.cancel.cancel();
        }

        shared.sink.on_progress(success, errors, shared.items.len());

        if !shared.inter_request_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(shared.inter_request_delay) => {}
                _ = shared.cancel.cancelled() => {}
            }
        }
    }

    debug!(worker = worker_id, "Worker exiting");
}

/// Run one item to a terminal outcome: resolve, consult cache, then fetch
/// with key rotation and bounded retry
async fn process_item(shared: &Shared, item: &WorkItem) -> ItemOutcome {
    let reference = match ChannelRef::parse(&item.identity) {
        Ok(r) => r,
        // Resolution failures consume no key and are never retried
        Err(e) => {
            return ItemOutcome::Error {
                kind: ItemErrorKind::InvalidInput,
                message: e.to_string(),
            }
        }
    };

    let cache_key = reference.cache_key();
    if let Some(info) = shared.cache.get(&cache_key) {
        debug!(index = item.index, key = %cache_key, "Cache hit");
        return ItemOutcome::Success {
            info,
            from_cache: true,
        };
    }

    let mut attempts = 0u32;
    // A leased key is retained across transient retries; quota rotation
    // drops it so the next iteration leases a fresh one
    let mut retained_key: Option<String> = None;

    loop {
        let key = match retained_key.take() {
            Some(key) => key,
            None => match shared.key_pool.lease() {
                Some(key) => key,
                None => {
                    return ItemOutcome::Error {
                        kind: ItemErrorKind::NoAvailableKeys,
                        message: "no API key available".to_string(),
                    }
                }
            },
        };

        attempts += 1;
        let error = match shared.fetcher.fetch(&reference, &key).await {
            Ok(info) => {
                if let Err(e) = shared.cache.put(&cache_key, info.clone()) {
                    warn!(key = %cache_key, error = %e, "Failed to cache result");
                }
                return ItemOutcome::Success {
                    info,
                    from_cache: false,
                };
            }
            Err(error) => error,
        };

        match error.kind {
            FetchErrorKind::InvalidInput => {
                return ItemOutcome::Error {
                    kind: ItemErrorKind::InvalidInput,
                    message: error.message,
                }
            }
            FetchErrorKind::Fatal => {
                return ItemOutcome::Error {
                    kind: ItemErrorKind::Fatal,
                    message: error.message,
                }
            }
            FetchErrorKind::QuotaExceeded => {
                shared.key_pool.mark_exhausted(&key);
                shared.sink.on_key_exhausted(
                    shared.key_pool.exhausted_count(),
                    shared.key_pool.available_count(),
                );
                if attempts >= shared.max_attempts {
                    return ItemOutcome::Error {
                        kind: ItemErrorKind::QuotaExceeded,
                        message: format!(
                            "gave up after {attempts} attempts: {}",
                            error.message
                        ),
                    };
                }
                // Retry immediately with a freshly leased key, no backoff
            }
            FetchErrorKind::Transient => {
                if attempts >= shared.max_attempts {
                    return ItemOutcome::Error {
                        kind: ItemErrorKind::Transient,
                        message: format!(
                            "gave up after {attempts} attempts: {}",
                            error.message
                        ),
                    };
                }
                let delay = backoff_delay(attempts);
                warn!(
                    index = item.index,
                    attempt = attempts,
                    backoff_ms = delay.as_millis() as u64,
                    error = %error.message,
                    "Transient fetch failure; retrying after backoff"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shared.cancel.cancelled() => {
                        return ItemOutcome::Error {
                            kind: ItemErrorKind::Cancelled,
                            message: "batch cancelled during retry backoff".to_string(),
                        };
                    }
                }
                retained_key = Some(key);
            }
        }
    }
}
