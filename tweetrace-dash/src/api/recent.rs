//! Last collected tweets for one name, or for all

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tweetrace_common::db::scored;
use tweetrace_common::ScoredTweet;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const ALL: &str = "All";
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// A tracked label or name (case-insensitive), or `All`
    pub name: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub name: String,
    pub tweets: Vec<RecentTweet>,
}

#[derive(Debug, Serialize)]
pub struct RecentTweet {
    pub created_at: NaiveDateTime,
    pub name: String,
    pub text: String,
    pub score: i64,
}

impl From<ScoredTweet> for RecentTweet {
    fn from(row: ScoredTweet) -> Self {
        Self {
            created_at: row.created_at,
            name: row.name,
            text: row.text,
            score: row.score,
        }
    }
}

/// GET /api/recent?name=<label|All>&limit=<k>
///
/// The last `k` scored rows from `start_date` on, in table order, oldest
/// first.
pub async fn get_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<RecentResponse>> {
    let settings = &state.settings;
    let requested = query.name.unwrap_or_else(|| ALL.to_string());
    let limit = query.limit.unwrap_or(settings.recent_limit);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let filter = if requested.eq_ignore_ascii_case(ALL) {
        None
    } else {
        let tracked = settings
            .tracked
            .iter()
            .find(|t| t.label.eq_ignore_ascii_case(&requested) || t.name.eq_ignore_ascii_case(&requested))
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown name: {}", requested)))?;
        Some(tracked.name.as_str())
    };

    let since = settings.start_date.and_time(chrono::NaiveTime::MIN);
    let rows = scored::recent_scored(&state.db, filter, since, limit).await?;

    Ok(Json(RecentResponse {
        name: requested,
        tweets: rows.into_iter().map(RecentTweet::from).collect(),
    }))
}
