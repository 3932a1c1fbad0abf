//! # Channel Batch Fetcher Library
//!
//! A library for fetching channel metadata for large batches of free-form
//! channel URLs while sharing a finite pool of rate-limited API keys across
//! concurrent workers.
//!
//! ## Features
//!
//! - **Bounded Concurrency**: 1-30 workers jointly process an ordered item
//!   list exactly once each, with results returned in submission order
//! - **Key Rotation**: round-robin leasing over validated API keys, with
//!   automatic rotation off quota-exhausted keys
//! - **Retry with Backoff**: transient failures retry with exponential
//!   backoff up to a fixed attempt budget
//! - **Result Caching**: a 24-hour TTL cache short-circuits duplicate lookups
//! - **Cooperative Cancellation**: Ctrl+C and total key exhaustion both stop
//!   new work while letting in-flight requests finish
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use channel_batch_fetcher::cache::{MemoryCacheStore, ResultCache};
//! use channel_batch_fetcher::dispatcher::BatchDispatcher;
//! use channel_batch_fetcher::fetcher::youtube::YoutubeDataApi;
//! use channel_batch_fetcher::keypool::KeyPool;
//! use channel_batch_fetcher::WorkItem;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(YoutubeDataApi::new()?);
//! let pool = Arc::new(KeyPool::new(vec!["AIza...".to_string()]));
//! pool.validate_all(api.as_ref(), |done, label| {
//!     println!("validated {label} ({:.0}%)", done * 100.0);
//! })
//! .await;
//!
//! let cache = Arc::new(ResultCache::new(Arc::new(MemoryCacheStore::new())));
//! let items = vec![WorkItem::new(0, "https://youtube.com/@example")];
//!
//! let dispatcher = BatchDispatcher::new(api, pool, cache).with_concurrency(4);
//! let results = dispatcher.run(items).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`identifier`] - Channel URL parsing into typed references
//! - [`keypool`] - API key validation, rotation, and exhaustion bookkeeping
//! - [`cache`] - TTL-bounded result cache over a pluggable store
//! - [`dispatcher`] - Worker pool, retry policy, and progress events
//! - [`fetcher`] - Fetcher/validator contracts and the YouTube Data API client
//! - [`output`] - Result export writers (CSV)

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Graceful cancellation token shared across workers
pub mod cancel;

/// TTL-bounded result cache
pub mod cache;

/// CLI command implementations
pub mod cli;

/// Batch dispatch orchestration
pub mod dispatcher;

/// Fetcher contracts and implementations
pub mod fetcher;

/// Channel URL parsing and validation
pub mod identifier;

/// API key pool with rotation and exhaustion tracking
pub mod keypool;

/// Result export writers
pub mod output;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use identifier::ChannelRef;

/// Channel metadata payload returned by the fetch collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelInfo {
    /// Canonical channel ID (e.g., "UCxxxx")
    pub channel_id: String,
    /// Channel title
    pub title: String,
    /// Channel description (may be empty)
    pub description: String,
    /// Custom URL / handle if the channel has one (e.g., "@example")
    pub custom_url: Option<String>,
    /// Channel creation time (RFC 3339)
    pub published_at: Option<String>,
    /// Country code if published by the channel
    pub country: Option<String>,
    /// Subscriber count (None when hidden by the channel)
    pub subscriber_count: Option<u64>,
    /// Total video count
    pub video_count: u64,
    /// Total view count
    pub view_count: u64,
}

impl ChannelInfo {
    /// Validate payload integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.channel_id.is_empty() {
            return Err("Channel ID cannot be empty".to_string());
        }

        if self.title.is_empty() {
            return Err(format!("Channel {} has an empty title", self.channel_id));
        }

        Ok(())
    }
}

/// One unit of work submitted to the dispatcher
///
/// Immutable once submitted. `extra` is caller-supplied side data echoed back
/// unchanged alongside the result (e.g., spreadsheet row context).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Position in the submitted batch; results are ordered by this index
    pub index: usize,
    /// Raw input identity (free-form channel URL or handle)
    pub identity: String,
    /// Caller side data echoed back unchanged
    pub extra: HashMap<String, String>,
}

impl WorkItem {
    /// Create a work item without side data
    pub fn new(index: usize, identity: impl Into<String>) -> Self {
        Self {
            index,
            identity: identity.into(),
            extra: HashMap::new(),
        }
    }

    /// Attach caller side data
    pub fn with_extra(mut self, extra: HashMap<String, String>) -> Self {
        self.extra = extra;
        self
    }
}

/// Terminal per-item failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    /// The raw identity could not be resolved; never retried
    InvalidInput,
    /// No key was available when the item needed one; never retried
    NoAvailableKeys,
    /// Every attempt ended in a quota signal and the attempt budget ran out
    QuotaExceeded,
    /// Transient failures persisted past the attempt budget
    Transient,
    /// Unrecoverable collaborator failure (e.g., malformed response)
    Fatal,
    /// The batch was cancelled before this item was claimed or completed
    Cancelled,
}

impl std::fmt::Display for ItemErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemErrorKind::InvalidInput => "invalid_input",
            ItemErrorKind::NoAvailableKeys => "no_available_keys",
            ItemErrorKind::QuotaExceeded => "quota_exceeded",
            ItemErrorKind::Transient => "transient",
            ItemErrorKind::Fatal => "fatal",
            ItemErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Terminal result for one work item
///
/// Exactly one outcome is produced per submitted item, written into the
/// results slot addressed by the item's original index. This is what keeps
/// output ordering stable regardless of completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Metadata was fetched (or served from cache)
    Success {
        /// The fetched payload
        info: ChannelInfo,
        /// Whether the payload came from the result cache
        from_cache: bool,
    },
    /// The item failed terminally
    Error {
        /// Failure category
        kind: ItemErrorKind,
        /// Human-readable detail
        message: String,
    },
}

impl ItemOutcome {
    /// Whether this outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success { .. })
    }

    /// Failure kind, if this outcome is an error
    pub fn error_kind(&self) -> Option<ItemErrorKind> {
        match self {
            ItemOutcome::Error { kind, .. } => Some(*kind),
            ItemOutcome::Success { .. } => None,
        }
    }
}
