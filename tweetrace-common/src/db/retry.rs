//! Reconnect-and-retry-once for database operations
//!
//! **Algorithm:**
//! 1. Run the operation against the current pool
//! 2. On success, return [`Attempted::FirstTry`]
//! 3. On a transient error (database or I/O): log WARN, wait `backoff`,
//!    rebuild the pool, run the operation once more
//! 4. A second failure is returned to the caller; so is any non-transient
//!    error from the first attempt (no retry)

use super::Database;
use crate::Result;
use sqlx::SqlitePool;
use std::future::Future;
use std::time::Duration;

/// Which attempt produced the value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempted<T> {
    FirstTry(T),
    AfterReconnect(T),
}

impl<T> Attempted<T> {
    pub fn into_inner(self) -> T {
        match self {
            Attempted::FirstTry(v) | Attempted::AfterReconnect(v) => v,
        }
    }

    pub fn reconnected(&self) -> bool {
        matches!(self, Attempted::AfterReconnect(_))
    }
}

/// Run `operation`, reconnecting and retrying once on a transient failure.
///
/// The operation receives a clone of the current pool (cheap, reference
/// counted), so the retry automatically runs against the new connection.
pub async fn with_reconnect<T, F, Fut>(
    db: &mut Database,
    operation_name: &str,
    backoff: Duration,
    operation: F,
) -> Result<Attempted<T>>
where
    F: FnMut(SqlitePool) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_reconnect_hook(db, operation_name, backoff, || {}, operation).await
}

/// [`with_reconnect`], calling `on_retry` once the first attempt has failed
/// and before the backoff and reconnect start.
pub async fn with_reconnect_hook<T, F, Fut, H>(
    db: &mut Database,
    operation_name: &str,
    backoff: Duration,
    on_retry: H,
    mut operation: F,
) -> Result<Attempted<T>>
where
    F: FnMut(SqlitePool) -> Fut,
    Fut: Future<Output = Result<T>>,
    H: FnOnce(),
{
    let err = match operation(db.pool().clone()).await {
        Ok(value) => return Ok(Attempted::FirstTry(value)),
        Err(err) if err.is_transient() => err,
        Err(err) => return Err(err),
    };

    tracing::warn!(
        operation = operation_name,
        backoff_ms = backoff.as_millis() as u64,
        error = %err,
        "Database operation failed, reconnecting"
    );
    on_retry();

    if !backoff.is_zero() {
        tokio::time::sleep(backoff).await;
    }
    db.reconnect().await?;

    match operation(db.pool().clone()).await {
        Ok(value) => {
            tracing::info!(operation = operation_name, "Database operation succeeded after reconnect");
            Ok(Attempted::AfterReconnect(value))
        }
        Err(err) => {
            tracing::error!(
                operation = operation_name,
                error = %err,
                "Database operation failed again after reconnect"
            );
            Err(err)
        }
    }
}
