//! API key pool with validation, round-robin rotation, and exhaustion
//! bookkeeping
//!
//! The pool is the shared, contended resource of a batch run. [`KeyPool::lease`]
//! and [`KeyPool::mark_exhausted`] are the only critical sections in the
//! system; both are short and perform no I/O under the lock. A key that
//! signals quota exhaustion leaves the rotation set for the rest of the run
//! but its record is retained for end-of-run reporting.
//!
//! The pool is an explicit instance handed to the dispatcher; there is no
//! process-global registry, so separate runs cannot interfere.

use crate::dispatcher::config::VALIDATION_DELAY;
use crate::fetcher::KeyValidator;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Lifecycle status of one credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Submitted but not yet validated
    Pending,
    /// Validated and eligible for rotation
    Valid,
    /// Failed validation; never enters rotation
    Invalid,
    /// Quota signaled as depleted; removed from rotation for this run
    QuotaExceeded,
}

/// Bookkeeping record for one submitted credential
///
/// Created when the pool is built, mutated only by pool operations, never
/// deleted.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    /// The credential itself
    pub key: String,
    /// Current lifecycle status
    pub status: KeyStatus,
    /// Number of leases granted to this key
    pub request_count: u64,
    /// When the key was last leased
    pub last_used_at: Option<DateTime<Utc>>,
    /// Validation or exhaustion detail, if any
    pub error_detail: Option<String>,
}

impl KeyRecord {
    fn new(key: String) -> Self {
        Self {
            key,
            status: KeyStatus::Pending,
            request_count: 0,
            last_used_at: None,
            error_detail: None,
        }
    }
}

/// Rotation state guarded by the pool mutex
#[derive(Debug, Default)]
struct PoolState {
    records: Vec<KeyRecord>,
    /// Indices into `records` of currently-valid keys, in rotation order
    rotation: Vec<usize>,
    /// Next rotation position, always `< rotation.len()` when non-empty
    cursor: usize,
}

/// Mutable registry of credentials shared by all workers
#[derive(Debug)]
pub struct KeyPool {
    state: Mutex<PoolState>,
}

impl KeyPool {
    /// Build a pool from raw keys; every key starts [`KeyStatus::Pending`]
    /// and the rotation set is empty until validation runs.
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            state: Mutex::new(PoolState {
                records: keys.into_iter().map(KeyRecord::new).collect(),
                rotation: Vec::new(),
                cursor: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate every key sequentially, building the rotation set
    ///
    /// Validation is deliberately sequential with a small inter-call delay so
    /// the validation endpoint is not hammered. `on_progress` receives the
    /// completed fraction and a masked key label after each key. Returns the
    /// disjoint sets of valid and invalid keys; a batch must not start with
    /// zero valid keys.
    pub async fn validate_all<F>(
        &self,
        validator: &dyn KeyValidator,
        mut on_progress: F,
    ) -> (Vec<String>, Vec<String>)
    where
        F: FnMut(f64, &str),
    {
        let keys: Vec<String> = {
            let state = self.lock();
            state.records.iter().map(|r| r.key.clone()).collect()
        };

        let total = keys.len();
        let mut valid = Vec::new();
        let mut invalid = Vec::new();

        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(VALIDATION_DELAY).await;
            }

            let outcome = validator.validate(key).await;

            {
                let mut state = self.lock();
                // Records are created at build time and never removed
                if let Some(pos) = state.records.iter().position(|r| r.key == *key) {
                    match &outcome {
                        Ok(true) => {
                            state.records[pos].status = KeyStatus::Valid;
                            state.rotation.push(pos);
                        }
                        Ok(false) => {
                            state.records[pos].status = KeyStatus::Invalid;
                        }
                        Err(detail) => {
                            state.records[pos].status = KeyStatus::Invalid;
                            state.records[pos].error_detail = Some(detail.clone());
                        }
                    }
                }
            }

            let label = mask_key(key);
            match outcome {
                Ok(true) => {
                    debug!(key = %label, "Key validated");
                    valid.push(key.clone());
                }
                Ok(false) => {
                    warn!(key = %label, "Key rejected by validator");
                    invalid.push(key.clone());
                }
                Err(detail) => {
                    warn!(key = %label, error = %detail, "Key validation failed");
                    invalid.push(key.clone());
                }
            }

            on_progress((i + 1) as f64 / total.max(1) as f64, &label);
        }

        info!(
            valid = valid.len(),
            invalid = invalid.len(),
            "Key validation complete"
        );
        (valid, invalid)
    }

    /// Lease the next key in round-robin order among currently-valid keys
    ///
    /// Returns `None` when the valid set is empty. Safe under concurrent
    /// invocation; the rotation cursor advances modulo the current size of
    /// the valid set so no key is skipped or leased twice per cycle.
    pub fn lease(&self) -> Option<String> {
        let mut state = self.lock();
        if state.rotation.is_empty() {
            return None;
        }

        let cursor = state.cursor % state.rotation.len();
        let record_idx = state.rotation[cursor];
        state.cursor = (cursor + 1) % state.rotation.len();

        let record = &mut state.records[record_idx];
        record.request_count += 1;
        record.last_used_at = Some(Utc::now());
        Some(record.key.clone())
    }

    /// Mark a key's quota as depleted, removing it from rotation
    ///
    /// Idempotent: marking an already-exhausted (or unknown) key is a no-op.
    /// The rotation cursor is adjusted so the next lease continues cleanly
    /// over the shrunk set.
    pub fn mark_exhausted(&self, key: &str) {
        let mut state = self.lock();
        let Some(record_idx) = state.records.iter().position(|r| r.key == key) else {
            return;
        };
        if state.records[record_idx].status == KeyStatus::QuotaExceeded {
            return;
        }

        state.records[record_idx].status = KeyStatus::QuotaExceeded;
        state.records[record_idx].error_detail = Some("quota exhausted".to_string());

        if let Some(rot_pos) = state.rotation.iter().position(|&i| i == record_idx) {
            state.rotation.remove(rot_pos);
            if rot_pos < state.cursor {
                state.cursor -= 1;
            }
            if state.rotation.is_empty() {
                state.cursor = 0;
            } else {
                state.cursor %= state.rotation.len();
            }
        }

        debug!(key = %mask_key(key), remaining = state.rotation.len(), "Key marked exhausted");
    }

    /// Whether at least one key is eligible for leasing
    pub fn has_available(&self) -> bool {
        !self.lock().rotation.is_empty()
    }

    /// Number of keys currently eligible for leasing
    pub fn available_count(&self) -> usize {
        self.lock().rotation.len()
    }

    /// Number of keys exhausted during this run
    pub fn exhausted_count(&self) -> usize {
        self.lock()
            .records
            .iter()
            .filter(|r| r.status == KeyStatus::QuotaExceeded)
            .count()
    }

    /// Total number of submitted keys, regardless of status
    pub fn total_count(&self) -> usize {
        self.lock().records.len()
    }

    /// Snapshot of every record, for end-of-run reporting
    pub fn records(&self) -> Vec<KeyRecord> {
        self.lock().records.clone()
    }
}

/// Mask a credential for logs: first four and last four characters with the
/// middle elided. Short keys are fully elided.
pub fn mask_key(key: &str) -> String {
    // Counted in chars, not bytes: keys come verbatim from user input and
    // byte slicing would panic inside a multi-byte character
    let len = key.chars().count();
    if len <= 8 {
        return "****".to_string();
    }
    let head: String = key.chars().take(4).collect();
    let tail: String = key.chars().skip(len - 4).collect();
    format!("{head}...{tail}")
}
