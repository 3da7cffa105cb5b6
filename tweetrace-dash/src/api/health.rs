//! Liveness plus a read against the scored table

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use tweetrace_common::db::scored;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database cannot be read
    pub status: String,
    pub module: String,
    pub version: String,
    pub start_date: NaiveDate,
    pub scored_rows: Option<i64>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, scored_rows) = match scored::count_scored(&state.db).await {
        Ok(rows) => (StatusCode::OK, "ok", Some(rows)),
        Err(e) => {
            tracing::warn!("Health check could not read sentiment_score: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", None)
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            module: "tweetrace-dash".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_date: state.settings.start_date,
            scored_rows,
        }),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
