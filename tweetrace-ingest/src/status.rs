//! Streaming API message model
//!
//! Only the fields ingestion needs are decoded; everything else in the
//! payload is ignored.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tweetrace_common::{Error, Result, StagedTweet, TrackedName};

/// `created_at` as sent by the v1.1 API: `Wed Apr 14 09:12:55 +0000 2021`
const TWITTER_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// A post delivered by the filtered stream
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: u64,
    #[serde(deserialize_with = "deserialize_twitter_time")]
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub extended_tweet: Option<ExtendedTweet>,
    /// Present only on reshares
    #[serde(default)]
    pub retweeted_status: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendedTweet {
    #[serde(default)]
    pub full_text: Option<String>,
}

impl Status {
    pub fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some()
    }

    /// Untruncated text: `extended_tweet.full_text`, else `text`, else `full_text`
    pub fn best_text(&self) -> Option<&str> {
        self.extended_tweet
            .as_ref()
            .and_then(|ext| ext.full_text.as_deref())
            .or(self.text.as_deref())
            .or(self.full_text.as_deref())
    }

    /// Source id as stored in the database (signed 64-bit)
    pub fn tweet_id(&self) -> Result<i64> {
        i64::try_from(self.id)
            .map_err(|_| Error::InvalidInput(format!("tweet id {} out of range", self.id)))
    }

    /// One staging row per tracked name mentioned in the text.
    ///
    /// Empty for reshares and posts without text.
    pub fn staged_rows(&self, tracked: &[TrackedName]) -> Result<Vec<StagedTweet>> {
        if self.is_retweet() {
            return Ok(Vec::new());
        }
        let Some(text) = self.best_text() else {
            return Ok(Vec::new());
        };

        let tweet_id = self.tweet_id()?;
        Ok(tracked
            .iter()
            .filter(|t| t.is_mentioned_in(text))
            .map(|t| StagedTweet::new(tweet_id, self.created_at, t.name.clone(), text))
            .collect())
    }
}

fn deserialize_twitter_time<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_twitter_time(&raw).map_err(serde::de::Error::custom)
}

/// Parse a v1.1 timestamp into naive UTC
pub fn parse_twitter_time(raw: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    DateTime::parse_from_str(raw, TWITTER_TIME_FORMAT).map(|dt| dt.naive_utc())
}

/// One line of the stream body, classified
#[derive(Debug, Clone)]
pub enum StreamMessage {
    Status(Box<Status>),
    /// More posts matched than the stream delivered
    Limit { undelivered: u64 },
    /// Stall warning: the client is falling behind
    Warning { code: String, message: String },
    Delete,
    Disconnect { code: i64, reason: String },
    Unknown,
}

impl StreamMessage {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(line)?;

        if let Some(limit) = value.get("limit") {
            let undelivered = limit.get("track").and_then(Value::as_u64).unwrap_or(0);
            return Ok(StreamMessage::Limit { undelivered });
        }
        if let Some(warning) = value.get("warning") {
            return Ok(StreamMessage::Warning {
                code: str_field(warning, "code"),
                message: str_field(warning, "message"),
            });
        }
        if value.get("delete").is_some() {
            return Ok(StreamMessage::Delete);
        }
        if let Some(disconnect) = value.get("disconnect") {
            return Ok(StreamMessage::Disconnect {
                code: disconnect.get("code").and_then(Value::as_i64).unwrap_or(0),
                reason: str_field(disconnect, "reason"),
            });
        }
        if value.get("id").is_some() && value.get("created_at").is_some() {
            let status: Status = serde_json::from_value(value)?;
            return Ok(StreamMessage::Status(Box::new(status)));
        }

        Ok(StreamMessage::Unknown)
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
