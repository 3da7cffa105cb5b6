//! Stream client against a local HTTP server
//!
//! The server speaks just enough of the filtered stream protocol:
//! a `\r\n`-delimited body of JSON messages, or an error status.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tweetrace_common::config::{DatabaseConfig, TwitterConfig};
use tweetrace_common::db::{staging, Database};
use tweetrace_common::models::default_tracked_names;
use tweetrace_common::Result;
use tweetrace_ingest::{
    ListenerControl, Status, StreamClient, StreamListener, TweetsListener,
};

const BODY: &str = concat!(
    "\r\n",
    r#"{"id": 1, "created_at": "Wed Apr 14 09:00:00 +0000 2021", "text": "Scholz heute"}"#,
    "\r\n",
    r#"{"limit": {"track": 4}}"#,
    "\r\n",
    "{broken json\r\n",
    r#"{"id": 2, "created_at": "Wed Apr 14 09:01:00 +0000 2021", "text": "RT", "retweeted_status": {"id": 1}}"#,
    "\r\n",
    r#"{"id": 3, "created_at": "Wed Apr 14 09:02:00 +0000 2021", "text": "x", "extended_tweet": {"full_text": "Habeck und Laschet"}}"#,
    "\r\n",
);

async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/1.1/statuses/filter.json", addr)
}

fn twitter_config(url: String) -> TwitterConfig {
    TwitterConfig {
        consumer_key: Some("ck".to_string()),
        consumer_secret: Some("cs".to_string()),
        access_token: Some("at".to_string()),
        access_token_secret: Some("ats".to_string()),
        stream_url: url,
        ..TwitterConfig::default()
    }
}

/// Collects statuses, stops after `limit`
struct Collecting {
    ids: Vec<u64>,
    limit: usize,
    connects: usize,
    errors: Vec<u16>,
}

#[async_trait]
impl StreamListener for Collecting {
    async fn on_connect(&mut self) {
        self.connects += 1;
    }

    async fn on_status(&mut self, status: Status) -> Result<ListenerControl> {
        self.ids.push(status.id);
        if self.ids.len() >= self.limit {
            Ok(ListenerControl::Stop)
        } else {
            Ok(ListenerControl::Continue)
        }
    }

    async fn on_error(&mut self, status_code: u16) -> ListenerControl {
        self.errors.push(status_code);
        ListenerControl::Stop
    }
}

#[tokio::test]
async fn test_statuses_delivered_and_request_signed() {
    let seen_request: Arc<Mutex<Option<(String, String)>>> = Arc::new(Mutex::new(None));
    let seen = seen_request.clone();
    let router = Router::new().route(
        "/1.1/statuses/filter.json",
        post(move |headers: HeaderMap, body: String| {
            let seen = seen.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                *seen.lock().unwrap() = Some((auth, body));
                BODY
            }
        }),
    );
    let url = spawn_server(router).await;

    let mut client = StreamClient::new(&twitter_config(url), &default_tracked_names()).unwrap();
    let mut listener = Collecting {
        ids: Vec::new(),
        limit: 3,
        connects: 0,
        errors: Vec::new(),
    };
    client.run(&mut listener).await.unwrap();

    // Retweets still reach the listener; filtering is the listener's job
    assert_eq!(listener.ids, vec![1, 2, 3]);
    assert_eq!(listener.connects, 1);

    let (auth, form) = seen_request.lock().unwrap().clone().unwrap();
    assert!(form.contains("track=scholz%2Chabeck%2Claschet"));
    assert!(form.contains("language=de"));
    assert!(form.contains("tweet_mode=extended"));
    assert!(auth.starts_with("OAuth "));
    assert!(auth.contains("oauth_consumer_key=\"ck\""));
    assert!(auth.contains("oauth_signature=\""));
}

#[tokio::test]
async fn test_rate_limited_stops_cleanly() {
    let router = Router::new().route(
        "/1.1/statuses/filter.json",
        post(|| async {
            (
                StatusCode::from_u16(420).unwrap(),
                "Enhance Your Calm",
            )
        }),
    );
    let url = spawn_server(router).await;

    let mut client = StreamClient::new(&twitter_config(url), &default_tracked_names()).unwrap();
    let mut listener = Collecting {
        ids: Vec::new(),
        limit: 1,
        connects: 0,
        errors: Vec::new(),
    };
    client.run(&mut listener).await.unwrap();

    assert_eq!(listener.errors, vec![420]);
    assert_eq!(listener.connects, 0);
    assert!(listener.ids.is_empty());
}

#[tokio::test]
async fn test_rate_limit_ends_ingestion_with_rows_kept() {
    // First connect streams posts and closes; the reconnect is rate limited
    let calls = Arc::new(Mutex::new(0usize));
    let counter = calls.clone();
    let router = Router::new().route(
        "/1.1/statuses/filter.json",
        post(move || {
            let counter = counter.clone();
            async move {
                let call = {
                    let mut n = counter.lock().unwrap();
                    *n += 1;
                    *n
                };
                if call == 1 {
                    (StatusCode::OK, BODY)
                } else {
                    (StatusCode::from_u16(420).unwrap(), "")
                }
            }
        }),
    );
    let url = spawn_server(router).await;

    let dir = TempDir::new().unwrap();
    let db_config = DatabaseConfig {
        path: dir.path().join("ingest.db"),
        ..DatabaseConfig::default()
    };
    let db = Database::open(&db_config).await.unwrap();

    let mut client = StreamClient::new(&twitter_config(url), &default_tracked_names()).unwrap();
    let mut listener = TweetsListener::new(db, default_tracked_names());
    client.run(&mut listener).await.unwrap();

    assert_eq!(*calls.lock().unwrap(), 2);
    let rows = staging::fetch_staged(listener.database().pool()).await.unwrap();
    let staged: Vec<(i64, &str)> = rows.iter().map(|r| (r.tweet_id, r.name.as_str())).collect();
    assert_eq!(staged, vec![(1, "scholz"), (3, "habeck"), (3, "laschet")]);
    assert_eq!(rows[2].text, "Habeck und Laschet");
}
