//! tweetrace-dash library - read-only sentiment dashboard
//!
//! Serves a single page that charts the daily mean sentiment and tweet count
//! per tracked name, plus JSON endpoints the page reads from.

use axum::Router;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tweetrace_common::config::TomlConfig;
use tweetrace_common::TrackedName;

pub mod aggregate;
pub mod api;
pub mod db;
pub mod error;

/// What the page shows, fixed at startup
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub tracked: Vec<TrackedName>,
    pub start_date: NaiveDate,
    pub recent_limit: u32,
    pub assets_dir: PathBuf,
}

impl DashboardSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            tracked: config.tracked.clone(),
            start_date: config.dashboard.start_date,
            recent_limit: config.dashboard.recent_limit,
            assets_dir: config.dashboard.assets_dir.clone(),
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (read-only)
    pub db: SqlitePool,
    pub settings: Arc<DashboardSettings>,
}

impl AppState {
    pub fn new(db: SqlitePool, settings: DashboardSettings) -> Self {
        Self {
            db,
            settings: Arc::new(settings),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let assets = ServeDir::new(&state.settings.assets_dir);

    Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/api/daily", get(api::get_daily))
        .route("/api/recent", get(api::get_recent))
        .nest_service("/assets", assets)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
