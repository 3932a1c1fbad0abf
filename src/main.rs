//! Main entry point for the channel-batch-fetcher CLI

use channel_batch_fetcher::cancel::CancelToken;
use channel_batch_fetcher::cli::{Cli, Commands};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("channel_batch_fetcher=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Wire Ctrl+C to the shared cancellation token; workers stop claiming
    // new items but let in-flight requests finish
    let cancel = CancelToken::shared();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing in-flight requests...");
                cancel.cancel();
            }
        }
    });

    let result = match cli.command {
        Commands::Fetch(ref args) => args
            .execute(cancel.clone())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::ClearCache(ref args) => args.execute().await.map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
