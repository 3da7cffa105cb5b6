//! Database access shared by all processes
//!
//! Every query takes a `&SqlitePool`. Processes that write hold a
//! [`Database`], which owns the pool and can replace it with a fresh one
//! when an operation fails.

pub mod init;
pub mod retry;
pub mod scored;
pub mod staging;

pub use init::init_database;
pub use retry::{with_reconnect, with_reconnect_hook, Attempted};

use crate::config::DatabaseConfig;
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Connection context for a read-write process
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    pool: SqlitePool,
}

impl Database {
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let pool = init_database(config).await?;
        Ok(Self {
            config: config.clone(),
            pool,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Build a new pool from the same settings and close the old one
    pub async fn reconnect(&mut self) -> Result<()> {
        let fresh = init_database(&self.config).await?;
        let stale = std::mem::replace(&mut self.pool, fresh);
        stale.close().await;
        info!(path = %self.config.path.display(), "Database reconnected");
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
