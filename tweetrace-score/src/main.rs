//! tweetrace-score - periodically scores staged posts with the sentiment
//! classifier and moves them into `sentiment_score`

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tweetrace_common::config::TomlConfig;
use tweetrace_common::db::Database;
use tweetrace_common::logging::{init_tracing, shutdown_signal};
use tweetrace_score::{InferenceClient, Scheduler, SentimentClassifier, TextCleaner};

/// Command-line arguments for tweetrace-score
#[derive(Parser, Debug)]
#[command(name = "tweetrace-score")]
#[command(about = "Score staged posts and append them to the scored table")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "TWEETRACE_CONFIG")]
    config: Option<PathBuf>,

    /// Database file (overrides config)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Stop after the first batch is scored
    #[arg(long)]
    once: bool,
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
        "Starting Tweet Race scoring (tweetrace-score) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database: {}", config.database.path.display());
    info!(
        "Classifier: {} (model {})",
        config.classifier.endpoint,
        config.classifier.model_dir.display()
    );

    let classifier = InferenceClient::new(&config.classifier).context("Failed to set up classifier")?;
    info!(classes = classifier.id2label().len(), "Loaded label map");

    let cleaner = TextCleaner::new().context("Failed to compile text cleaning patterns")?;

    let db = Database::open(&config.database)
        .await
        .context("Failed to open database")?;

    let mut scheduler = Scheduler::new(db, classifier, cleaner, config.scoring.clone()).with_once(args.once);

    let outcome = tokio::select! {
        result = scheduler.run() => result,
        _ = shutdown_signal() => Ok(()),
    };

    info!(reconnects = scheduler.reconnects(), "Scoring finished");
    scheduler.into_database().close().await;

    if let Err(e) = outcome {
        error!("Scoring stopped: {}", e);
        return Err(e.into());
    }
    Ok(())
}
