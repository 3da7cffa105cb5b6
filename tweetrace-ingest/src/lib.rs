//! tweetrace-ingest library
//!
//! Filtered stream ingestion: OAuth-signed connection to the streaming API,
//! message framing and classification, and the listener that writes one
//! staging row per tracked name mentioned in each post.

pub mod listener;
pub mod oauth;
pub mod status;
pub mod stream;

pub use listener::{ListenerControl, StreamListener, TweetsListener};
pub use status::{Status, StreamMessage};
pub use stream::{StreamClient, StreamError};
