//! HTTP handlers

mod daily;
mod health;
mod recent;
mod ui;

pub use daily::{get_daily, DailyResponse};
pub use health::{health_check, health_routes, HealthResponse};
pub use recent::{get_recent, RecentQuery, RecentResponse, RecentTweet};
pub use ui::{serve_app_js, serve_index};
