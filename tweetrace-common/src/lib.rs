//! # Tweet Race Common Library
//!
//! Shared code for the three Tweet Race processes:
//! - Database initialization, staging/scored table queries and the
//!   reconnect-and-retry-once wrapper
//! - Row models and the label → score mapping
//! - Configuration loading (TOML + environment overrides)
//! - Tracing setup and shutdown signal handling

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;

pub use error::{Error, Result};
pub use models::{ScoredTweet, SentimentScore, StagedTweet, TrackedName};
