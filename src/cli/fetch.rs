//! Fetch command implementation

use crate::cache::{JsonFileCacheStore, MemoryCacheStore, ResultCache};
use crate::cancel::SharedCancel;
use crate::cli::CliError;
use crate::dispatcher::config::MAX_CONCURRENCY;
use crate::dispatcher::{BatchDispatcher, LogSink};
use crate::fetcher::youtube::YoutubeDataApi;
use crate::keypool::{mask_key, KeyPool, KeyStatus};
use crate::output::csv::write_results;
use crate::WorkItem;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Default location for the persistent result cache
const DEFAULT_CACHE_FILE: &str = ".channel_cache.json";

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Channel batch fetcher CLI
#[derive(Debug, Parser)]
#[command(name = "channel-batch-fetcher", version, about)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch channel metadata for a list of URLs
    Fetch(FetchArgs),
    /// Clear the persistent result cache
    ClearCache(ClearCacheArgs),
}

/// Arguments for the fetch command
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Input file with one channel URL per line ('#' starts a comment)
    #[arg(short, long)]
    pub input: PathBuf,

    /// API keys, comma-separated
    #[arg(short, long, value_delimiter = ',', conflicts_with = "keys_file")]
    pub keys: Vec<String>,

    /// File with one API key per line
    #[arg(long)]
    pub keys_file: Option<PathBuf>,

    /// Number of concurrent workers (1-30)
    #[arg(short, long, default_value = "4", value_parser = parse_concurrency)]
    pub concurrency: usize,

    /// Output CSV path
    #[arg(short, long, default_value = "channels.csv")]
    pub output: PathBuf,

    /// Persistent cache file location
    #[arg(long, default_value = DEFAULT_CACHE_FILE)]
    pub cache_file: PathBuf,

    /// Disable the persistent cache for this run
    #[arg(long)]
    pub no_cache: bool,
}

impl FetchArgs {
    /// Execute the fetch command
    pub async fn execute(&self, cancel: SharedCancel) -> Result<(), CliError> {
        let items = read_items(&self.input)?;
        if items.is_empty() {
            return Err(CliError::InputError(format!(
                "no channel URLs found in {}",
                self.input.display()
            )));
        }

        let keys = self.collect_keys()?;
        if keys.is_empty() {
            return Err(CliError::InvalidArgument(
                "no API keys provided; use --keys or --keys-file".to_string(),
            ));
        }

        info!(
            items = items.len(),
            keys = keys.len(),
            concurrency = self.concurrency,
            "Starting fetch"
        );

        let api = Arc::new(YoutubeDataApi::new()?);
        let pool = Arc::new(KeyPool::new(keys));
        let (valid, invalid) = pool
            .validate_all(api.as_ref(), |fraction, label| {
                info!(key = %label, "Validated key ({:.0}%)", fraction * 100.0);
            })
            .await;
        if !invalid.is_empty() {
            warn!(count = invalid.len(), "Some keys failed validation");
        }
        info!(valid = valid.len(), "Key validation finished");

        let cache: Arc<ResultCache> = if self.no_cache {
            Arc::new(ResultCache::new(Arc::new(MemoryCacheStore::new())))
        } else {
            Arc::new(ResultCache::new(Arc::new(JsonFileCacheStore::open(
                &self.cache_file,
            )?)))
        };

        let dispatcher = BatchDispatcher::new(api, pool.clone(), cache)
            .with_concurrency(self.concurrency)
            .with_progress_sink(Arc::new(LogSink))
            .with_cancel_token(cancel);

        let outcomes = dispatcher.run(items.clone()).await?;

        let rows = write_results(&self.output, &items, &outcomes)?;
        let success = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            rows = rows,
            success = success,
            errors = outcomes.len() - success,
            output = %self.output.display(),
            "Results written"
        );

        report_key_usage(&pool);
        Ok(())
    }

    fn collect_keys(&self) -> Result<Vec<String>, CliError> {
        if let Some(path) = &self.keys_file {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| CliError::InputError(format!("{}: {e}", path.display())))?;
            Ok(raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from)
                .collect())
        } else {
            Ok(self
                .keys
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect())
        }
    }
}

/// Read work items from an input file, one URL per line
fn read_items(path: &PathBuf) -> Result<Vec<WorkItem>, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::InputError(format!("{}: {e}", path.display())))?;

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .enumerate()
        .map(|(index, line)| WorkItem::new(index, line))
        .collect())
}

/// Log per-key usage at the end of a run
fn report_key_usage(pool: &KeyPool) {
    for record in pool.records() {
        let status = match record.status {
            KeyStatus::Pending => "pending",
            KeyStatus::Valid => "valid",
            KeyStatus::Invalid => "invalid",
            KeyStatus::QuotaExceeded => "exhausted",
        };
        info!(
            key = %mask_key(&record.key),
            status = status,
            requests = record.request_count,
            "Key usage"
        );
    }
}

/// Arguments for the clear-cache command
#[derive(Debug, Args)]
pub struct ClearCacheArgs {
    /// Persistent cache file location
    #[arg(long, default_value = DEFAULT_CACHE_FILE)]
    pub cache_file: PathBuf,
}

impl ClearCacheArgs {
    /// Execute the clear-cache command
    pub async fn execute(&self) -> Result<(), CliError> {
        use crate::cache::CacheStore;

        if !self.cache_file.exists() {
            info!(path = %self.cache_file.display(), "No cache file; nothing to clear");
            return Ok(());
        }

        let store = JsonFileCacheStore::open(&self.cache_file)?;
        store.clear()?;
        info!(path = %self.cache_file.display(), "Cache cleared");
        Ok(())
    }
}
