//! Cooperative cancellation shared across worker tasks.
//!
//! Provides a lightweight [`CancelToken`] checked at the top of each worker's
//! claim loop. Cancelling stops new claims but never interrupts an in-flight
//! request; the same token serves user-initiated stops (Ctrl+C) and the
//! automatic all-keys-exhausted abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared handle to a cancellation token.
pub type SharedCancel = Arc<CancelToken>;

/// Coordinates cooperative cancellation across async tasks.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a new token.
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Create a new shared token wrapped in [`Arc`].
    pub fn shared() -> SharedCancel {
        Arc::new(Self::new())
    }

    /// Request cancellation. Notifies all registered waiters exactly once.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested. Returns immediately if already set.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before re-checking the flag so a cancel landing in
        // between cannot be missed
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
