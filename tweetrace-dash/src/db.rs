//! Read-only database access
//!
//! The dashboard never writes; ingestion and scoring keep writing to the
//! same file while it runs, so the connection is read-only but not immutable.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Connect with SQLite `mode=ro`
pub async fn connect_readonly(db_path: &Path, busy_timeout: Duration) -> Result<SqlitePool> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found: {}\nRun tweetrace-ingest or tweetrace-score first to create it.",
            db_path.display()
        );
    }

    let db_url = format!("sqlite://{}?mode=ro", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)
        .context("Invalid database path")?
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .context("Failed to connect to database in read-only mode")?;

    Ok(pool)
}
