//! Database initialization
//!
//! Opens (creating if needed) the shared SQLite file and makes sure both
//! pipeline tables exist. Safe to call from every process on every start.

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open a read-write pool and create tables if needed
pub async fn init_database(config: &DatabaseConfig) -> Result<SqlitePool> {
    let db_path = &config.path;
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL lets the dashboard read while ingestion and scoring write.
    // busy_timeout is per connection, so it goes on the connect options.
    let options = SqliteConnectOptions::from_str(&config.connect_url())?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tweets_table(&pool).await?;
    create_sentiment_score_table(&pool).await?;

    Ok(pool)
}

/// Staging table written by ingestion, drained by scoring
async fn create_tweets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tweets (
            tweet_id INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL,
            name VARCHAR(50) NOT NULL,
            text TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tweets_created_at ON tweets(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Append-only history read by the dashboard
async fn create_sentiment_score_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentiment_score (
            tweet_id INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL,
            name VARCHAR(50) NOT NULL,
            text TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score IN (-1, 0, 1))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sentiment_score_created_at ON sentiment_score(created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sentiment_score_name ON sentiment_score(name)")
        .execute(pool)
        .await?;

    Ok(())
}
