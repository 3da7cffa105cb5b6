//! Daily sentiment series for the chart

use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::Serialize;
use tweetrace_common::db::scored;
use tweetrace_common::TrackedName;

use crate::aggregate::{daily_points, DailyPoint};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DailyResponse {
    pub start_date: NaiveDate,
    /// Series to draw, in legend order, with their colors
    pub names: Vec<TrackedName>,
    pub points: Vec<DailyPoint>,
}

/// GET /api/daily
///
/// Per-day, per-name mean score and count from `start_date` on.
pub async fn get_daily(State(state): State<AppState>) -> ApiResult<Json<DailyResponse>> {
    let settings = &state.settings;
    let since = settings.start_date.and_time(chrono::NaiveTime::MIN);

    let rows = scored::fetch_scored_since(&state.db, since).await?;
    let points = daily_points(&rows);
    tracing::debug!(rows = rows.len(), points = points.len(), "Aggregated daily sentiment");

    Ok(Json(DailyResponse {
        start_date: settings.start_date,
        names: settings.tracked.clone(),
        points,
    }))
}
