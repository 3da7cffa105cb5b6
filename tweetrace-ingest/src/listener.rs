//! Stream callbacks and the listener that stages posts in the database

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tweetrace_common::db::{staging, with_reconnect, Database};
use tweetrace_common::{Error, Result, TrackedName};

use crate::status::Status;

/// HTTP status the streaming API uses for rate limiting
pub const RATE_LIMITED: u16 = 420;

/// What the stream client should do after a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerControl {
    Continue,
    Stop,
}

/// Callbacks invoked inline on the receive task
#[async_trait]
pub trait StreamListener: Send {
    async fn on_connect(&mut self) {}

    /// An `Err` here is fatal and ends the stream
    async fn on_status(&mut self, status: Status) -> Result<ListenerControl>;

    /// Non-success HTTP status when connecting
    async fn on_error(&mut self, status_code: u16) -> ListenerControl;
}

/// Writes one staging row per tracked name mentioned in each post
pub struct TweetsListener {
    db: Database,
    tracked: Vec<TrackedName>,
    retry_backoff: Duration,
    stored: u64,
}

impl TweetsListener {
    pub fn new(db: Database, tracked: Vec<TrackedName>) -> Self {
        Self {
            db,
            tracked,
            retry_backoff: Duration::ZERO,
            stored: 0,
        }
    }

    /// Wait before the reconnect-and-retry (immediate by default)
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Rows written since start
    pub fn stored(&self) -> u64 {
        self.stored
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn into_database(self) -> Database {
        self.db
    }
}

#[async_trait]
impl StreamListener for TweetsListener {
    async fn on_connect(&mut self) {
        info!(tracked = self.tracked.len(), "Stream connected");
    }

    async fn on_status(&mut self, status: Status) -> Result<ListenerControl> {
        if status.is_retweet() {
            debug!(tweet_id = status.id, "Skipping retweet");
            return Ok(ListenerControl::Continue);
        }
        if status.best_text().is_none() {
            warn!(tweet_id = status.id, "Status has no text, skipping");
            return Ok(ListenerControl::Continue);
        }

        let rows = match status.staged_rows(&self.tracked) {
            Ok(rows) => rows,
            Err(Error::InvalidInput(msg)) => {
                warn!(tweet_id = status.id, "Dropping status: {}", msg);
                return Ok(ListenerControl::Continue);
            }
            Err(e) => return Err(e),
        };
        if rows.is_empty() {
            debug!(tweet_id = status.id, "No tracked name in text");
            return Ok(ListenerControl::Continue);
        }

        // A retry re-runs every insert for this post
        let rows_ref = &rows;
        let result = with_reconnect(&mut self.db, "insert staged tweet", self.retry_backoff, |pool| async move {
            for row in rows_ref {
                staging::insert_staged(&pool, row).await?;
            }
            Ok(())
        })
        .await;

        match result {
            Ok(_) => {
                self.stored += rows.len() as u64;
                debug!(
                    tweet_id = status.id,
                    rows = rows.len(),
                    stored = self.stored,
                    "Staged tweet"
                );
                Ok(ListenerControl::Continue)
            }
            Err(Error::InvalidInput(msg)) => {
                warn!(tweet_id = status.id, "Dropping status: {}", msg);
                Ok(ListenerControl::Continue)
            }
            Err(e) => {
                error!(tweet_id = status.id, "Staging write failed after reconnect: {}", e);
                Err(e)
            }
        }
    }

    async fn on_error(&mut self, status_code: u16) -> ListenerControl {
        if status_code == RATE_LIMITED {
            error!(status_code, "Rate limited by streaming API, stopping");
            return ListenerControl::Stop;
        }
        warn!(status_code, "Streaming API returned an error, will reconnect");
        ListenerControl::Continue
    }
}
