//! tweetrace-score library
//!
//! Drains the `tweets` staging table: cleans each post, classifies it,
//! maps the label to -1/0/+1 and appends the result to `sentiment_score`.

pub mod classifier;
pub mod inference;
pub mod scheduler;
pub mod text;

pub use classifier::{ClassifierError, Id2Label, SentimentClassifier};
pub use inference::InferenceClient;
pub use scheduler::{CycleOutcome, Scheduler, SchedulerState, ScoreError};
pub use text::TextCleaner;
