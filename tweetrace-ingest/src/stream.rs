//! Filtered stream client
//!
//! Keeps one long-lived `POST statuses/filter.json` connection open, splits
//! the body into `\r\n`-delimited JSON messages and hands statuses to a
//! [`StreamListener`]. Dropped connections are reopened with the backoff
//! the streaming API asks clients to use.

use futures::StreamExt;
use reqwest::header::AUTHORIZATION;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use tweetrace_common::config::TwitterConfig;
use tweetrace_common::TrackedName;

use crate::listener::{ListenerControl, StreamListener};
use crate::oauth::OAuthSigner;
use crate::status::StreamMessage;

const USER_AGENT: &str = concat!("tweetrace-ingest/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const NETWORK_BACKOFF_STEP: Duration = Duration::from_millis(250);
const NETWORK_BACKOFF_MAX: Duration = Duration::from_secs(16);
const HTTP_BACKOFF_START: Duration = Duration::from_secs(5);
const HTTP_BACKOFF_MAX: Duration = Duration::from_secs(320);

/// Stream client errors
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("No data received for {0:?}")]
    Stalled(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Fatal error raised by the listener (e.g. database down after retry)
    #[error(transparent)]
    Listener(#[from] tweetrace_common::Error),
}

/// Reconnect delays: linear for network errors, exponential for HTTP errors
#[derive(Debug, Clone, Default)]
pub struct ReconnectPolicy {
    network_wait: Duration,
    http_wait: Duration,
}

impl ReconnectPolicy {
    pub fn next_network_delay(&mut self) -> Duration {
        self.network_wait = (self.network_wait + NETWORK_BACKOFF_STEP).min(NETWORK_BACKOFF_MAX);
        self.network_wait
    }

    pub fn next_http_delay(&mut self) -> Duration {
        self.http_wait = if self.http_wait.is_zero() {
            HTTP_BACKOFF_START
        } else {
            (self.http_wait * 2).min(HTTP_BACKOFF_MAX)
        };
        self.http_wait
    }

    /// Called after every successful connect
    pub fn reset(&mut self) {
        self.network_wait = Duration::ZERO;
        self.http_wait = Duration::ZERO;
    }
}

/// Accumulates body chunks and yields complete, non-blank lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        lines
    }
}

/// How one connection ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    /// The listener asked to stop
    Stopped,
    /// The server closed the body
    Closed,
}

/// Filtered stream connection manager
pub struct StreamClient {
    http_client: reqwest::Client,
    signer: OAuthSigner,
    url: String,
    params: Vec<(String, String)>,
    read_timeout: Duration,
    policy: ReconnectPolicy,
}

impl StreamClient {
    pub fn new(config: &TwitterConfig, tracked: &[TrackedName]) -> Result<Self, StreamError> {
        let credentials = config
            .credentials()
            .map_err(|e| StreamError::Config(e.to_string()))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StreamError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            signer: OAuthSigner::new(credentials),
            url: config.stream_url.clone(),
            params: filter_params(tracked, &config.language),
            read_timeout: config.read_timeout(),
            policy: ReconnectPolicy::default(),
        })
    }

    /// Form parameters sent with every connect
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Stream until the listener stops or fails.
    ///
    /// Returns `Ok` when the listener asked to stop (including on rate
    /// limiting) and `Err` when it raised a fatal error.
    pub async fn run<L: StreamListener>(&mut self, listener: &mut L) -> Result<(), StreamError> {
        info!(url = %self.url, track = ?self.params.first().map(|(_, v)| v), "Opening filtered stream");

        loop {
            let delay = match self.stream_once(listener).await {
                Ok(Session::Stopped) => {
                    info!("Listener stopped the stream");
                    return Ok(());
                }
                Ok(Session::Closed) => {
                    let delay = self.policy.next_network_delay();
                    warn!(delay_ms = delay.as_millis() as u64, "Stream closed by server, reconnecting");
                    delay
                }
                Err(StreamError::Http { status, body }) => {
                    if listener.on_error(status).await == ListenerControl::Stop {
                        return Ok(());
                    }
                    let delay = self.policy.next_http_delay();
                    warn!(
                        status,
                        body = %body,
                        delay_ms = delay.as_millis() as u64,
                        "Stream connect rejected, reconnecting"
                    );
                    delay
                }
                Err(e @ (StreamError::Network(_) | StreamError::Stalled(_))) => {
                    let delay = self.policy.next_network_delay();
                    warn!(delay_ms = delay.as_millis() as u64, "{}, reconnecting", e);
                    delay
                }
                Err(e) => return Err(e),
            };

            tokio::time::sleep(delay).await;
        }
    }

    async fn stream_once<L: StreamListener>(&mut self, listener: &mut L) -> Result<Session, StreamError> {
        let auth = self.signer.authorization_header("POST", &self.url, &self.params);

        let response = self
            .http_client
            .post(&self.url)
            .header(AUTHORIZATION, auth)
            .form(&self.params)
            .send()
            .await
            .map_err(|e| StreamError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Http {
                status: status.as_u16(),
                body,
            });
        }

        self.policy.reset();
        listener.on_connect().await;

        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();

        loop {
            // A quiet stream still sends keep-alive newlines; silence means a dead socket
            let chunk = match tokio::time::timeout(self.read_timeout, body.next()).await {
                Err(_) => return Err(StreamError::Stalled(self.read_timeout)),
                Ok(None) => return Ok(Session::Closed),
                Ok(Some(Err(e))) => return Err(StreamError::Network(e.to_string())),
                Ok(Some(Ok(chunk))) => chunk,
            };

            for line in lines.push(&chunk) {
                if dispatch(&line, listener).await? == ListenerControl::Stop {
                    return Ok(Session::Stopped);
                }
            }
        }
    }
}

/// Route one message: statuses to the listener, the rest to the log
async fn dispatch<L: StreamListener>(line: &str, listener: &mut L) -> Result<ListenerControl, StreamError> {
    let message = match StreamMessage::parse(line) {
        Ok(message) => message,
        Err(e) => {
            warn!("Skipping unparseable stream message: {}", e);
            return Ok(ListenerControl::Continue);
        }
    };

    match message {
        StreamMessage::Status(status) => Ok(listener.on_status(*status).await?),
        StreamMessage::Limit { undelivered } => {
            info!(undelivered, "Track limit notice");
            Ok(ListenerControl::Continue)
        }
        StreamMessage::Warning { code, message } => {
            warn!(code = %code, "Stall warning: {}", message);
            Ok(ListenerControl::Continue)
        }
        StreamMessage::Disconnect { code, reason } => {
            warn!(code, reason = %reason, "Disconnect notice");
            Ok(ListenerControl::Continue)
        }
        StreamMessage::Delete => {
            debug!("Delete notice");
            Ok(ListenerControl::Continue)
        }
        StreamMessage::Unknown => {
            debug!("Unknown stream message");
            Ok(ListenerControl::Continue)
        }
    }
}

/// `track`, `language` and the fixed stream options
pub fn filter_params(tracked: &[TrackedName], language: &str) -> Vec<(String, String)> {
    let track = tracked
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(",");

    vec![
        ("track".to_string(), track),
        ("language".to_string(), language.to_string()),
        ("tweet_mode".to_string(), "extended".to_string()),
        ("filter_level".to_string(), "low".to_string()),
        ("stall_warnings".to_string(), "true".to_string()),
    ]
}
