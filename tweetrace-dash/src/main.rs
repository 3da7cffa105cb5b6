//! tweetrace-dash - read-only web dashboard over `sentiment_score`

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tweetrace_common::config::TomlConfig;
use tweetrace_common::logging::{init_tracing, shutdown_signal};
use tweetrace_dash::{build_router, db, AppState, DashboardSettings};

/// Command-line arguments for tweetrace-dash
#[derive(Parser, Debug)]
#[command(name = "tweetrace-dash")]
#[command(about = "Web dashboard for daily tweet sentiment")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "TWEETRACE_CONFIG")]
    config: Option<PathBuf>,

    /// Database file (overrides config)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short, long, env = "TWEETRACE_DASH_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = args.database {
        config.database.path = path;
    }
    if let Some(bind) = args.bind {
        config.dashboard.bind = bind;
    }

    init_tracing(&config.logging.level);
    info!(
        "Starting Tweet Race dashboard (tweetrace-dash) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database path: {}", config.database.path.display());

    let busy_timeout = Duration::from_millis(config.database.busy_timeout_ms);
    let pool = match db::connect_readonly(&config.database.path, busy_timeout).await {
        Ok(pool) => {
            info!("Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let settings = DashboardSettings::from_config(&config);
    info!(
        start_date = %settings.start_date,
        recent_limit = settings.recent_limit,
        assets_dir = %settings.assets_dir.display(),
        "Dashboard settings"
    );

    let app = build_router(AppState::new(pool, settings));

    let listener = tokio::net::TcpListener::bind(&config.dashboard.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.dashboard.bind))?;
    info!("Listening on http://{}", config.dashboard.bind);
    info!("Health check: http://{}/health", config.dashboard.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
