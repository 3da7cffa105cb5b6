//! Row models shared by the ingestion, scoring and dashboard processes

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{Error, Result};

/// A raw post waiting in the `tweets` staging table.
///
/// A post that mentions two tracked names is staged twice, once per name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StagedTweet {
    pub tweet_id: i64,
    pub created_at: NaiveDateTime,
    pub name: String,
    pub text: String,
}

impl StagedTweet {
    pub fn new(
        tweet_id: i64,
        created_at: NaiveDateTime,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            tweet_id,
            created_at,
            name: name.into(),
            text: text.into(),
        }
    }

    /// Reject values the database would refuse.
    ///
    /// Text columns cannot hold NUL characters, and the name column is
    /// VARCHAR(50).
    pub fn validate(&self) -> Result<()> {
        if self.text.contains('\0') {
            return Err(Error::InvalidInput(format!(
                "tweet {} text contains a NUL character",
                self.tweet_id
            )));
        }
        if self.name.is_empty() || self.name.chars().count() > 50 {
            return Err(Error::InvalidInput(format!(
                "tweet {} has invalid name {:?}",
                self.tweet_id, self.name
            )));
        }
        Ok(())
    }

    /// Attach a score, replacing the text with the text that was classified.
    pub fn into_scored(self, text: String, score: SentimentScore) -> ScoredTweet {
        ScoredTweet {
            tweet_id: self.tweet_id,
            created_at: self.created_at,
            name: self.name,
            text,
            score: score.value(),
        }
    }
}

/// A row of the append-only `sentiment_score` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ScoredTweet {
    pub tweet_id: i64,
    pub created_at: NaiveDateTime,
    pub name: String,
    pub text: String,
    /// One of -1, 0, +1
    pub score: i64,
}

/// Sentiment class mapped to the integer stored in `sentiment_score.score`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentScore {
    Negative,
    Neutral,
    Positive,
}

impl SentimentScore {
    /// Map a classifier label to a score.
    ///
    /// Total: `negative` and `positive` are the only labels that move the
    /// score, every other label (including `neutral`) is neutral.
    pub fn from_label(label: &str) -> Self {
        match label {
            "negative" => SentimentScore::Negative,
            "positive" => SentimentScore::Positive,
            _ => SentimentScore::Neutral,
        }
    }

    pub fn value(self) -> i64 {
        match self {
            SentimentScore::Negative => -1,
            SentimentScore::Neutral => 0,
            SentimentScore::Positive => 1,
        }
    }
}

/// One monitored subject: the lowercase key stored in `name` columns, the
/// label shown on the dashboard, and its chart color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedName {
    pub name: String,
    pub label: String,
    pub color: String,
}

impl TrackedName {
    pub fn new(name: &str, label: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            color: color.to_string(),
        }
    }

    /// Case-insensitive substring match against post text
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.name.to_lowercase())
    }
}

/// The three politicians followed by default
pub fn default_tracked_names() -> Vec<TrackedName> {
    vec![
        TrackedName::new("scholz", "Scholz", "red"),
        TrackedName::new("habeck", "Habeck", "green"),
        TrackedName::new("laschet", "Laschet", "black"),
    ]
}
