//! `sentiment_score` table (append-only)

use crate::models::ScoredTweet;
use crate::Result;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;

/// Append a batch of scored rows in one transaction. Returns rows written.
pub async fn append_scored(pool: &SqlitePool, rows: &[ScoredTweet]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0;

    for row in rows {
        let result = sqlx::query(
            "INSERT INTO sentiment_score (tweet_id, created_at, name, text, score) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(row.tweet_id)
        .bind(row.created_at)
        .bind(&row.name)
        .bind(&row.text)
        .bind(row.score)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// Scored rows created at or after `since`, in table order
pub async fn fetch_scored_since(pool: &SqlitePool, since: NaiveDateTime) -> Result<Vec<ScoredTweet>> {
    let rows = sqlx::query_as::<_, ScoredTweet>(
        r#"
        SELECT tweet_id, created_at, name, text, score
        FROM sentiment_score
        WHERE created_at >= ?
        ORDER BY rowid
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The last `limit` rows in table order created at or after `since`,
/// optionally for one name.
///
/// Returned oldest first, as they appear at the tail of the table.
pub async fn recent_scored(
    pool: &SqlitePool,
    name: Option<&str>,
    since: NaiveDateTime,
    limit: u32,
) -> Result<Vec<ScoredTweet>> {
    let mut rows = sqlx::query_as::<_, ScoredTweet>(
        r#"
        SELECT tweet_id, created_at, name, text, score
        FROM sentiment_score
        WHERE created_at >= ?
          AND (? IS NULL OR name = ?)
        ORDER BY rowid DESC
        LIMIT ?
        "#,
    )
    .bind(since)
    .bind(name)
    .bind(name)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.reverse();
    Ok(rows)
}

pub async fn count_scored(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM sentiment_score")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
