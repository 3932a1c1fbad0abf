//! Fetcher contracts and implementations
//!
//! Defines the collaborator traits the dispatcher depends on and the
//! structured error type they must return. The error carries an explicit
//! [`FetchErrorKind`] so the dispatcher can tell quota exhaustion apart from
//! transient failures without matching on free-text messages.

use crate::{ChannelInfo, ChannelRef};
use async_trait::async_trait;

pub mod api_config;
pub mod youtube;

/// Failure categories reported by a fetch collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The key's quota is depleted; rotate to another key and retry
    QuotaExceeded,
    /// Temporary failure (network, 5xx); back off and retry
    Transient,
    /// The request itself is unacceptable (bad reference, 404); never retry
    InvalidInput,
    /// Unrecoverable failure (malformed response, auth revoked); never retry
    Fatal,
}

/// Structured fetch failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct FetchError {
    /// Failure category used by the dispatcher's retry logic
    pub kind: FetchErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl FetchError {
    /// Build an error of the given kind
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a quota-exhaustion error
    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::QuotaExceeded, message)
    }

    /// Shorthand for a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Transient, message)
    }

    /// Shorthand for an invalid-input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::InvalidInput, message)
    }

    /// Shorthand for a fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Fatal, message)
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Remote metadata lookup collaborator
///
/// One call per (reference, key) attempt. Implementations must be safe to
/// share across workers.
#[async_trait]
pub trait ChannelFetcher: Send + Sync {
    /// Fetch channel metadata for a resolved reference using `api_key`
    async fn fetch(&self, reference: &ChannelRef, api_key: &str) -> FetchResult<ChannelInfo>;
}

/// Credential pre-validation collaborator
#[async_trait]
pub trait KeyValidator: Send + Sync {
    /// Check whether `key` is usable: `Ok(true)` usable, `Ok(false)`
    /// rejected by the remote service, `Err` when the check itself failed
    async fn validate(&self, key: &str) -> Result<bool, String>;
}
