//! Configuration loading
//!
//! All three binaries read the same TOML file. Resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `TWEETRACE_CONFIG` environment variable
//! 3. User config dir, then `/etc/tweetrace/config.toml`
//! 4. Compiled defaults (missing file logs a warning, startup continues)
//!
//! Secrets and the database location can be overridden per field from the
//! environment after the file is read.

use crate::models::{default_tracked_names, TrackedName};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "TWEETRACE_CONFIG";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database: DatabaseConfig,
    pub twitter: TwitterConfig,
    pub tracked: Vec<TrackedName>,
    pub classifier: ClassifierConfig,
    pub scoring: ScoringConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

/// Streaming API access. Credentials are usually supplied via environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    pub stream_url: String,
    pub language: String,
    pub read_timeout_secs: u64,
}

/// The four OAuth 1.0a secrets, all present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Local directory of the fine-tuned model (its `config.json` holds `id2label`)
    pub model_dir: PathBuf,
    /// Base URL of the inference server hosting that model
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub idle_backoff_secs: u64,
    pub cycle_interval_secs: u64,
    pub post_write_pause_secs: u64,
    pub read_retry_backoff_secs: u64,
    pub write_retry_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,
    /// First day shown on the chart
    pub start_date: NaiveDate,
    pub recent_limit: u32,
    pub assets_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            twitter: TwitterConfig::default(),
            tracked: default_tracked_names(),
            classifier: ClassifierConfig::default(),
            scoring: ScoringConfig::default(),
            dashboard: DashboardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            consumer_key: None,
            consumer_secret: None,
            access_token: None,
            access_token_secret: None,
            stream_url: "https://stream.twitter.com/1.1/statuses/filter.json".to_string(),
            language: "de".to_string(),
            read_timeout_secs: 90,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("savedmodels/bert-fine-tuned-gersent-final"),
            endpoint: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            idle_backoff_secs: 5 * 60,
            cycle_interval_secs: 2 * 60,
            post_write_pause_secs: 2,
            read_retry_backoff_secs: 1,
            write_retry_backoff_secs: 2,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5730".to_string(),
            start_date: NaiveDate::from_ymd_opt(2021, 4, 13).unwrap_or_default(),
            recent_limit: 3,
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Resolve, read, override from environment, and validate
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_arg) {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Read {} failed: {}", path.display(), e))
                })?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)?
            }
            Some(path) if cli_arg.is_some() => {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Self::default()
            }
            None => {
                warn!("No config file found, using compiled defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Per-field environment overrides (highest priority for secrets)
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = env_value("TWEETRACE_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(url) = env_value("TWEETRACE_CLASSIFIER_URL") {
            self.classifier.endpoint = url;
        }
        let twitter = &mut self.twitter;
        for (var, slot) in [
            ("TWITTER_CONSUMER_KEY", &mut twitter.consumer_key),
            ("TWITTER_CONSUMER_SECRET", &mut twitter.consumer_secret),
            ("TWITTER_ACCESS_TOKEN", &mut twitter.access_token),
            ("TWITTER_ACCESS_TOKEN_SECRET", &mut twitter.access_token_secret),
        ] {
            if let Some(value) = env_value(var) {
                *slot = Some(value);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.tracked.is_empty() {
            return Err(Error::Config("at least one [[tracked]] name is required".to_string()));
        }
        let mut seen = HashSet::new();
        for tracked in &self.tracked {
            let key = tracked.name.to_lowercase();
            if key.trim().is_empty() {
                return Err(Error::Config("tracked name must not be empty".to_string()));
            }
            if !seen.insert(key) {
                return Err(Error::Config(format!(
                    "tracked name {:?} listed twice",
                    tracked.name
                )));
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, VALID_LOG_LEVELS
            )));
        }

        if self.dashboard.recent_limit == 0 {
            return Err(Error::Config(
                "dashboard.recent_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Connection string for read-write processes (creates the file if missing)
    pub fn connect_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path.display())
    }
}

impl TwitterConfig {
    /// All four secrets, or a config error naming the first missing one
    pub fn credentials(&self) -> Result<TwitterCredentials> {
        fn required(value: &Option<String>, key: &str) -> Result<String> {
            match value {
                Some(v) if is_valid_key(v) => Ok(v.clone()),
                _ => Err(Error::Config(format!(
                    "twitter.{key} not configured (set it in config.toml or {})",
                    format!("TWITTER_{}", key.to_uppercase())
                ))),
            }
        }

        Ok(TwitterCredentials {
            consumer_key: required(&self.consumer_key, "consumer_key")?,
            consumer_secret: required(&self.consumer_secret, "consumer_secret")?,
            access_token: required(&self.access_token, "access_token")?,
            access_token_secret: required(&self.access_token_secret, "access_token_secret")?,
        })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ScoringConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_secs(self.idle_backoff_secs)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn post_write_pause(&self) -> Duration {
        Duration::from_secs(self.post_write_pause_secs)
    }

    pub fn read_retry_backoff(&self) -> Duration {
        Duration::from_secs(self.read_retry_backoff_secs)
    }

    pub fn write_retry_backoff(&self) -> Duration {
        Duration::from_secs(self.write_retry_backoff_secs)
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Find the config file following the priority order in the module docs.
///
/// Returns the CLI or environment path even if it does not exist, so the
/// caller can report it.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("tweetrace").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/tweetrace/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tweetrace"))
        .unwrap_or_else(|| PathBuf::from("./tweetrace_data"))
        .join("tweetrace.db")
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_key(v))
}
