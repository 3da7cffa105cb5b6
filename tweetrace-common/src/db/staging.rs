//! `tweets` staging table

use crate::models::StagedTweet;
use crate::Result;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;

/// Insert one staging row. Rows the database would refuse fail with
/// `Error::InvalidInput` before any statement runs.
pub async fn insert_staged(pool: &SqlitePool, tweet: &StagedTweet) -> Result<()> {
    tweet.validate()?;

    sqlx::query("INSERT INTO tweets (tweet_id, created_at, name, text) VALUES (?, ?, ?, ?)")
        .bind(tweet.tweet_id)
        .bind(tweet.created_at)
        .bind(&tweet.name)
        .bind(&tweet.text)
        .execute(pool)
        .await?;

    Ok(())
}

/// All staging rows in insertion order
pub async fn fetch_staged(pool: &SqlitePool) -> Result<Vec<StagedTweet>> {
    let rows = sqlx::query_as::<_, StagedTweet>(
        "SELECT tweet_id, created_at, name, text FROM tweets ORDER BY rowid",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete every staging row created at or before `watermark`.
///
/// Returns the number of rows removed. Rows inserted after the batch was
/// read but dated at or before the watermark are removed too.
pub async fn delete_staged_through(pool: &SqlitePool, watermark: NaiveDateTime) -> Result<u64> {
    let result = sqlx::query("DELETE FROM tweets WHERE created_at <= ?")
        .bind(watermark)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn count_staged(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tweets")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
