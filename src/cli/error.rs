//! CLI error types and conversions

use crate::cache::CacheError;
use crate::dispatcher::DispatchError;
use crate::fetcher::FetchError;
use crate::identifier::IdentifierError;
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Identifier error
    #[error("identifier error: {0}")]
    IdentifierError(#[from] IdentifierError),

    /// Dispatch error
    #[error("dispatch error: {0}")]
    DispatchError(#[from] DispatchError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetchError(#[from] FetchError),

    /// Cache error
    #[error("cache error: {0}")]
    CacheError(#[from] CacheError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Input file error
    #[error("input error: {0}")]
    InputError(String),
}
