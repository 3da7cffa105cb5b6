//! tweetrace-ingest - streams posts mentioning the tracked names into the
//! `tweets` staging table

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tweetrace_common::config::TomlConfig;
use tweetrace_common::db::Database;
use tweetrace_common::logging::{init_tracing, shutdown_signal};
use tweetrace_ingest::{StreamClient, TweetsListener};

/// Command-line arguments for tweetrace-ingest
#[derive(Parser, Debug)]
#[command(name = "tweetrace-ingest")]
#[command(about = "Stream tracked posts into the staging table")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "TWEETRACE_CONFIG")]
    config: Option<PathBuf>,

    /// Database file (overrides config)
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = args.database {
        config.database.path = path;
    }

    init_tracing(&config.logging.level);
    info!(
        "Starting Tweet Race ingestion (tweetrace-ingest) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database: {}", config.database.path.display());

    let db = Database::open(&config.database)
        .await
        .context("Failed to open database")?;

    let mut client = StreamClient::new(&config.twitter, &config.tracked)?;
    let mut listener = TweetsListener::new(db, config.tracked.clone());

    let outcome = tokio::select! {
        result = client.run(&mut listener) => result,
        _ = shutdown_signal() => Ok(()),
    };

    info!(stored = listener.stored(), "Ingestion finished");
    listener.into_database().close().await;

    if let Err(e) = outcome {
        error!("Ingestion stopped: {}", e);
        return Err(e.into());
    }
    Ok(())
}
