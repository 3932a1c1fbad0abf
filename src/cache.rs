//! Time-bounded result cache
//!
//! Maps a normalized channel reference (`<kind>:<value>`) to a previously
//! fetched payload. Entries expire logically after a fixed TTL: expiry is
//! checked at read time and expired entries are simply ignored, never served
//! stale. There is no active eviction thread.
//!
//! The backing store is pluggable via [`CacheStore`], an opaque JSON-blob
//! key/value persistence contract. [`MemoryCacheStore`] backs tests and
//! library embedding; [`JsonFileCacheStore`] persists across CLI runs.

use crate::dispatcher::config::CACHE_TTL;
use crate::ChannelInfo;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Cache persistence errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Underlying store I/O failure
    #[error("cache store error: {0}")]
    StoreError(String),

    /// Entry serialization failure
    #[error("cache serialization error: {0}")]
    SerializeError(String),
}

/// Opaque key/value persistence for JSON-serializable blobs
///
/// Implementations must be safe to share across workers. Reads and writes
/// are independent per key; no cross-key ordering is required.
pub trait CacheStore: Send + Sync {
    /// Fetch the blob stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    /// Store `value` under `key`, overwriting unconditionally
    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError>;

    /// Remove every stored blob
    fn clear(&self) -> Result<(), CacheError>;
}

/// One cached payload with its storage timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    payload: ChannelInfo,
    stored_at: DateTime<Utc>,
}

/// TTL-bounded cache over a [`CacheStore`]
///
/// Logically global to a run; [`ResultCache::clear`] is a separate
/// maintenance action, not part of the dispatch contract.
pub struct ResultCache {
    store: std::sync::Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache with the default 24-hour TTL
    pub fn new(store: std::sync::Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: Duration::from_std(CACHE_TTL).unwrap_or_else(|_| Duration::hours(24)),
        }
    }

    /// Override the TTL
    pub fn with_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.ttl = Duration::from_std(ttl).unwrap_or(self.ttl);
        self
    }

    /// Look up a payload by normalized cache key
    ///
    /// Returns the payload only if it was stored less than TTL ago. An
    /// expired or undecodable entry behaves as a miss; store errors are
    /// logged and treated as misses so a broken cache never fails a fetch.
    pub fn get(&self, key: &str) -> Option<ChannelInfo> {
        let value = match self.store.get(key) {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed; treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable cache entry; treating as miss");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(entry.stored_at);
        if age >= self.ttl {
            debug!(key = %key, age_secs = age.num_seconds(), "Cache entry expired");
            return None;
        }

        Some(entry.payload)
    }

    /// Store a payload under a normalized cache key, overwriting any
    /// previous entry
    pub fn put(&self, key: &str, payload: ChannelInfo) -> Result<(), CacheError> {
        let entry = CacheEntry {
            payload,
            stored_at: Utc::now(),
        };
        let value = serde_json::to_value(&entry)
            .map_err(|e| CacheError::SerializeError(e.to_string()))?;
        self.store.set(key, value)
    }

    /// Drop every cached entry (maintenance action between runs)
    pub fn clear(&self) -> Result<(), CacheError> {
        self.store.clear()
    }
}

/// In-memory [`CacheStore`] backed by a single shared map
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryCacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::StoreError(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::StoreError(e.to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::StoreError(e.to_string()))?;
        entries.clear();
        Ok(())
    }
}

/// File-backed [`CacheStore`] persisting the whole map as one JSON document
///
/// The map is loaded once at open and rewritten on every mutation. Suitable
/// for CLI runs where write volume is one entry per fetched item.
pub struct JsonFileCacheStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl JsonFileCacheStore {
    /// Open a store at `path`, loading existing content if the file exists
    ///
    /// An unreadable or corrupt file starts the store empty rather than
    /// failing the run; the next write replaces it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CacheError::StoreError(e.to_string()))?;
            }
        }

        let entries = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(map) => map,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Corrupt cache file; starting empty");
                        HashMap::new()
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable cache file; starting empty");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, serde_json::Value>) -> Result<(), CacheError> {
        let raw = serde_json::to_string(entries)
            .map_err(|e| CacheError::SerializeError(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| CacheError::StoreError(e.to_string()))
    }
}

impl CacheStore for JsonFileCacheStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::StoreError(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::StoreError(e.to_string()))?;
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::StoreError(e.to_string()))?;
        entries.clear();
        self.persist(&entries)
    }
}
