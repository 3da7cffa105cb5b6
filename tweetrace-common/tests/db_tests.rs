//! Integration tests for database initialization and the table queries

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;
use tweetrace_common::config::DatabaseConfig;
use tweetrace_common::db::{init_database, scored, staging, Database};
use tweetrace_common::{Error, ScoredTweet, SentimentScore, StagedTweet};

fn at(day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 4, day)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

fn config_in(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        path: dir.path().join("nested").join("tweetrace.db"),
        ..DatabaseConfig::default()
    }
}

fn scored_row(id: i64, ts: NaiveDateTime, name: &str, score: SentimentScore) -> ScoredTweet {
    StagedTweet::new(id, ts, name, format!("text {id}")).into_scored(format!("text {id}"), score)
}

#[tokio::test]
async fn test_database_created_with_parent_directory() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let pool = init_database(&config).await.unwrap();
    assert!(config.path.exists());

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(tables, vec!["sentiment_score".to_string(), "tweets".to_string()]);
}

#[tokio::test]
async fn test_init_is_idempotent_and_keeps_rows() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let pool = init_database(&config).await.unwrap();
    staging::insert_staged(&pool, &StagedTweet::new(1, at(14, 9, 0), "scholz", "Scholz"))
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&config).await.unwrap();
    assert_eq!(staging::count_staged(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_staging_round_trip_in_insertion_order() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&config_in(&dir)).await.unwrap();

    // Inserted out of time order on purpose
    let rows = vec![
        StagedTweet::new(3, at(15, 10, 0), "habeck", "Habeck ist da"),
        StagedTweet::new(1, at(14, 9, 0), "scholz", "Grüße an Scholz"),
        StagedTweet::new(1, at(14, 9, 0), "laschet", "Grüße an Scholz und Laschet"),
    ];
    for row in &rows {
        staging::insert_staged(&pool, row).await.unwrap();
    }

    let fetched = staging::fetch_staged(&pool).await.unwrap();
    assert_eq!(fetched, rows);
}

#[tokio::test]
async fn test_nul_text_rejected_before_insert() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&config_in(&dir)).await.unwrap();

    let bad = StagedTweet::new(9, at(14, 9, 0), "scholz", "Scholz\0");
    let result = staging::insert_staged(&pool, &bad).await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert_eq!(staging::count_staged(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_through_watermark_is_inclusive() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&config_in(&dir)).await.unwrap();

    for (id, ts) in [(1, at(14, 9, 0)), (2, at(14, 10, 0)), (3, at(14, 11, 0))] {
        staging::insert_staged(&pool, &StagedTweet::new(id, ts, "scholz", "Scholz"))
            .await
            .unwrap();
    }

    let removed = staging::delete_staged_through(&pool, at(14, 10, 0)).await.unwrap();
    assert_eq!(removed, 2);

    let left = staging::fetch_staged(&pool).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].tweet_id, 3);
}

#[tokio::test]
async fn test_append_and_filter_scored_since() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&config_in(&dir)).await.unwrap();

    let rows = vec![
        scored_row(1, at(12, 23, 59), "scholz", SentimentScore::Positive),
        scored_row(2, at(13, 0, 0), "scholz", SentimentScore::Negative),
        scored_row(3, at(14, 8, 0), "habeck", SentimentScore::Neutral),
    ];
    assert_eq!(scored::append_scored(&pool, &rows).await.unwrap(), 3);
    assert_eq!(scored::append_scored(&pool, &[]).await.unwrap(), 0);

    let since = at(13, 0, 0);
    let fetched = scored::fetch_scored_since(&pool, since).await.unwrap();
    assert_eq!(fetched, rows[1..].to_vec());
}

#[tokio::test]
async fn test_out_of_range_score_rejected_by_schema() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&config_in(&dir)).await.unwrap();

    let mut row = scored_row(1, at(14, 8, 0), "scholz", SentimentScore::Positive);
    row.score = 5;
    let good = scored_row(2, at(14, 8, 0), "scholz", SentimentScore::Positive);

    // One transaction: the valid row is rolled back with the invalid one
    assert!(scored::append_scored(&pool, &[good, row]).await.is_err());
    assert_eq!(scored::count_scored(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_recent_scored_tail_per_name() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&config_in(&dir)).await.unwrap();

    let rows: Vec<ScoredTweet> = (1..=5)
        .map(|i| {
            let name = if i % 2 == 0 { "habeck" } else { "scholz" };
            scored_row(i, at(14, i as u32, 0), name, SentimentScore::Neutral)
        })
        .collect();
    scored::append_scored(&pool, &rows).await.unwrap();

    let all: Vec<i64> = scored::recent_scored(&pool, None, at(14, 0, 0), 3)
        .await
        .unwrap()
        .iter()
        .map(|r| r.tweet_id)
        .collect();
    assert_eq!(all, vec![3, 4, 5]);

    let scholz: Vec<i64> = scored::recent_scored(&pool, Some("scholz"), at(14, 0, 0), 2)
        .await
        .unwrap()
        .iter()
        .map(|r| r.tweet_id)
        .collect();
    assert_eq!(scholz, vec![3, 5]);

    let none = scored::recent_scored(&pool, Some("laschet"), at(14, 0, 0), 3)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_recent_scored_respects_cutoff() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&config_in(&dir)).await.unwrap();

    let rows = vec![
        scored_row(1, at(12, 23, 0), "scholz", SentimentScore::Positive),
        scored_row(2, at(13, 0, 0), "scholz", SentimentScore::Negative),
        scored_row(3, at(13, 8, 0), "habeck", SentimentScore::Neutral),
    ];
    scored::append_scored(&pool, &rows).await.unwrap();

    let ids: Vec<i64> = scored::recent_scored(&pool, None, at(13, 0, 0), 10)
        .await
        .unwrap()
        .iter()
        .map(|r| r.tweet_id)
        .collect();
    assert_eq!(ids, vec![2, 3]);

    let scholz = scored::recent_scored(&pool, Some("scholz"), at(13, 0, 0), 10)
        .await
        .unwrap();
    assert_eq!(scholz.len(), 1);
    assert_eq!(scholz[0].tweet_id, 2);
}

#[tokio::test]
async fn test_reconnect_replaces_pool() {
    let dir = TempDir::new().unwrap();
    let mut db = Database::open(&config_in(&dir)).await.unwrap();

    staging::insert_staged(db.pool(), &StagedTweet::new(1, at(14, 9, 0), "scholz", "Scholz"))
        .await
        .unwrap();

    db.reconnect().await.unwrap();
    assert_eq!(staging::count_staged(db.pool()).await.unwrap(), 1);
    db.close().await;
}
