//! The dashboard page and its script, compiled into the binary.
//!
//! Served with `no-cache` so a restarted dashboard never pairs a new page
//! with a stale script.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{Html, IntoResponse};

const INDEX_HTML: &str = include_str!("../../ui/index.html");
const APP_JS: &str = include_str!("../../ui/app.js");

/// GET /
pub async fn serve_index() -> impl IntoResponse {
    ([(CACHE_CONTROL, "no-cache")], Html(INDEX_HTML))
}

/// GET /static/app.js
pub async fn serve_app_js() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
        ],
        APP_JS,
    )
}
