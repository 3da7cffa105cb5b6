//! Poll/score/write loop
//!
//! **States:**
//! - Idle: staging is empty, wait `idle_backoff` and check again
//! - Processing: score every staged row, append results, delete sources
//! - Reconnecting: a read or write failed, rebuild the connection, wait a
//!   short backoff and retry once (a second failure ends the process)
//!
//! The current state is published on a `watch` channel.
//!
//! A classifier request that fails on the server side (network error, 5xx)
//! is retried once after the read backoff.
//!
//! Rows inserted while a cycle runs and dated at or before the cycle's
//! watermark are deleted without being scored.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tweetrace_common::config::ScoringConfig;
use tweetrace_common::db::{scored, staging, with_reconnect_hook, Attempted, Database};
use tweetrace_common::{ScoredTweet, SentimentScore};

use crate::classifier::{ClassifierError, SentimentClassifier};
use crate::text::TextCleaner;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Database(#[from] tweetrace_common::Error),

    #[error("Classification failed for tweet {tweet_id}: {source}")]
    Classifier {
        tweet_id: i64,
        #[source]
        source: ClassifierError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Processing,
    Reconnecting,
}

/// Result of one pass over the staging table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing staged, nothing written
    Idle,
    Processed {
        scored: usize,
        deleted: u64,
        watermark: NaiveDateTime,
    },
}

/// Scoring context: the database, the classifier and the loop timings
pub struct Scheduler<C> {
    db: Database,
    classifier: C,
    cleaner: TextCleaner,
    timing: ScoringConfig,
    state: watch::Sender<SchedulerState>,
    reconnects: u64,
    classifier_retries: u64,
    once: bool,
}

impl<C: SentimentClassifier> Scheduler<C> {
    pub fn new(db: Database, classifier: C, cleaner: TextCleaner, timing: ScoringConfig) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            db,
            classifier,
            cleaner,
            timing,
            state,
            reconnects: 0,
            classifier_retries: 0,
            once: false,
        }
    }

    /// Stop after the first processing cycle (idle cycles do not count)
    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Follow state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Successful retries after a reconnect since start
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Classifier requests sent a second time since start
    pub fn classifier_retries(&self) -> u64 {
        self.classifier_retries
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn into_database(self) -> Database {
        self.db
    }

    /// Loop until a fatal error, or until the first processing cycle in
    /// `once` mode
    pub async fn run(&mut self) -> Result<(), ScoreError> {
        info!(
            idle_backoff_secs = self.timing.idle_backoff_secs,
            cycle_interval_secs = self.timing.cycle_interval_secs,
            once = self.once,
            "Scoring loop started"
        );

        loop {
            match self.run_cycle().await? {
                CycleOutcome::Idle => {
                    info!(
                        wait_secs = self.timing.idle_backoff_secs,
                        "No staged tweets, waiting"
                    );
                    tokio::time::sleep(self.timing.idle_backoff()).await;
                }
                CycleOutcome::Processed { .. } => {
                    if self.once {
                        info!("Single cycle requested, stopping");
                        return Ok(());
                    }
                    tokio::time::sleep(self.timing.cycle_interval()).await;
                }
            }
        }
    }

    /// Read, score, append, pause, delete
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, ScoreError> {
        let started = Instant::now();
        set_state(&self.state, SchedulerState::Processing);

        let rows = self
            .db_step(
                "fetch staged tweets",
                self.timing.read_retry_backoff(),
                |pool| async move { staging::fetch_staged(&pool).await },
            )
            .await?;

        let Some(watermark) = rows.iter().map(|r| r.created_at).max() else {
            set_state(&self.state, SchedulerState::Idle);
            return Ok(CycleOutcome::Idle);
        };
        debug!(rows = rows.len(), watermark = %watermark, "Read staged tweets");

        let mut results: Vec<ScoredTweet> = Vec::with_capacity(rows.len());
        for row in rows {
            let text = self.cleaner.clean(&row.text);
            let label = self.classify(row.tweet_id, &text).await?;
            let score = SentimentScore::from_label(&label);
            debug!(tweet_id = row.tweet_id, label = %label, score = score.value(), "Scored");
            results.push(row.into_scored(text, score));
        }

        let results_ref = &results;
        let written = self
            .db_step(
                "append scored tweets",
                self.timing.write_retry_backoff(),
                |pool| async move { scored::append_scored(&pool, results_ref).await },
            )
            .await?;

        tokio::time::sleep(self.timing.post_write_pause()).await;

        let deleted = self
            .db_step(
                "delete staged tweets",
                self.timing.write_retry_backoff(),
                |pool| async move { staging::delete_staged_through(&pool, watermark).await },
            )
            .await?;

        info!(
            scored = results.len(),
            written,
            deleted,
            watermark = %watermark,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scoring cycle complete"
        );

        Ok(CycleOutcome::Processed {
            scored: results.len(),
            deleted,
            watermark,
        })
    }

    /// Predict a label, retrying once when the server side failed
    async fn classify(&mut self, tweet_id: i64, text: &str) -> Result<String, ScoreError> {
        match self.classifier.predict_label(text).await {
            Ok(label) => return Ok(label),
            Err(e) if e.is_transient() => {
                self.classifier_retries += 1;
                warn!(
                    tweet_id,
                    backoff_ms = self.timing.read_retry_backoff().as_millis() as u64,
                    error = %e,
                    "Classification failed, retrying"
                );
            }
            Err(source) => return Err(ScoreError::Classifier { tweet_id, source }),
        }

        tokio::time::sleep(self.timing.read_retry_backoff()).await;
        self.classifier
            .predict_label(text)
            .await
            .map_err(|source| ScoreError::Classifier { tweet_id, source })
    }

    /// One database operation with reconnect-and-retry-once.
    ///
    /// The scheduler is Reconnecting from the first failure until the retry
    /// succeeds, and stays there if it does not.
    async fn db_step<T, F, Fut>(
        &mut self,
        operation_name: &str,
        backoff: Duration,
        operation: F,
    ) -> Result<T, ScoreError>
    where
        F: FnMut(SqlitePool) -> Fut,
        Fut: Future<Output = tweetrace_common::Result<T>>,
    {
        let state = &self.state;
        let attempted = with_reconnect_hook(
            &mut self.db,
            operation_name,
            backoff,
            || set_state(state, SchedulerState::Reconnecting),
            operation,
        )
        .await?;

        match attempted {
            Attempted::FirstTry(value) => Ok(value),
            Attempted::AfterReconnect(value) => {
                self.reconnects += 1;
                set_state(&self.state, SchedulerState::Processing);
                warn!(
                    operation = operation_name,
                    reconnects = self.reconnects,
                    "Recovered after reconnect, back to processing"
                );
                Ok(value)
            }
        }
    }
}

fn set_state(state: &watch::Sender<SchedulerState>, next: SchedulerState) {
    state.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        debug!(from = ?*current, to = ?next, "Scheduler state");
        *current = next;
        true
    });
}
