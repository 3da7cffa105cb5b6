//! Configuration loading, resolution order and environment overrides
//!
//! Tests that touch process environment are marked #[serial].

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use tweetrace_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use tweetrace_common::Error;

const OVERRIDE_VARS: [&str; 7] = [
    CONFIG_ENV_VAR,
    "TWEETRACE_DB_PATH",
    "TWEETRACE_CLASSIFIER_URL",
    "TWITTER_CONSUMER_KEY",
    "TWITTER_CONSUMER_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_TOKEN_SECRET",
];

fn clear_env() {
    for var in OVERRIDE_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_full_file_parses() {
    let config = TomlConfig::from_toml_str(
        r#"
        [database]
        path = "/var/lib/tweetrace/tweets.db"
        max_connections = 2

        [twitter]
        consumer_key = "ck"
        language = "en"

        [[tracked]]
        name = "merkel"
        label = "Merkel"
        color = "orange"

        [scoring]
        idle_backoff_secs = 10

        [dashboard]
        start_date = "2021-05-01"
        recent_limit = 5

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.database.path, PathBuf::from("/var/lib/tweetrace/tweets.db"));
    assert_eq!(config.database.max_connections, 2);
    // Unset fields keep their defaults
    assert_eq!(config.database.busy_timeout_ms, 5000);
    assert_eq!(config.twitter.consumer_key.as_deref(), Some("ck"));
    assert_eq!(config.twitter.language, "en");
    assert_eq!(config.tracked.len(), 1);
    assert_eq!(config.tracked[0].label, "Merkel");
    assert_eq!(config.scoring.idle_backoff_secs, 10);
    assert_eq!(config.scoring.cycle_interval_secs, 120);
    assert_eq!(config.dashboard.start_date.to_string(), "2021-05-01");
    assert_eq!(config.dashboard.recent_limit, 5);
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_file_gives_defaults() {
    let config = TomlConfig::from_toml_str("").unwrap();
    let names: Vec<&str> = config.tracked.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["scholz", "habeck", "laschet"]);
    assert_eq!(config.dashboard.start_date.to_string(), "2021-04-13");
    assert_eq!(config.dashboard.recent_limit, 3);
}

#[test]
fn test_malformed_file_is_config_error() {
    let result = TomlConfig::from_toml_str("[database\npath = 1");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let cli = PathBuf::from("/tmp/from-cli.toml");
    assert_eq!(resolve_config_path(Some(&cli)), Some(cli.clone()));
    assert_eq!(
        resolve_config_path(None),
        Some(PathBuf::from("/tmp/from-env.toml"))
    );

    clear_env();
}

#[test]
#[serial]
fn test_missing_cli_file_is_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    assert!(matches!(TomlConfig::load(Some(&missing)), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_missing_env_file_falls_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    env::set_var(CONFIG_ENV_VAR, dir.path().join("absent.toml"));

    let config = TomlConfig::load(None).unwrap();
    assert_eq!(config.tracked.len(), 3);

    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_applied_after_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [database]
        path = "/from/file.db"

        [twitter]
        consumer_key = "file-key"
        consumer_secret = "file-secret"
        "#,
    )
    .unwrap();

    env::set_var("TWEETRACE_DB_PATH", "/from/env.db");
    env::set_var("TWITTER_CONSUMER_KEY", "env-key");
    env::set_var("TWITTER_ACCESS_TOKEN", "env-token");
    env::set_var("TWITTER_ACCESS_TOKEN_SECRET", "env-token-secret");
    env::set_var("TWEETRACE_CLASSIFIER_URL", "http://classifier:8080");

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.database.path, PathBuf::from("/from/env.db"));
    assert_eq!(config.classifier.endpoint, "http://classifier:8080");

    let creds = config.twitter.credentials().unwrap();
    assert_eq!(creds.consumer_key, "env-key");
    assert_eq!(creds.consumer_secret, "file-secret");
    assert_eq!(creds.access_token, "env-token");
    assert_eq!(creds.access_token_secret, "env-token-secret");

    clear_env();
}

#[test]
#[serial]
fn test_blank_env_value_ignored() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[database]\npath = \"/from/file.db\"\n").unwrap();
    env::set_var("TWEETRACE_DB_PATH", "   ");

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.database.path, PathBuf::from("/from/file.db"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_file_rejected_on_load() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[database]\nmax_connections = 0\n").unwrap();

    assert!(matches!(TomlConfig::load(Some(&path)), Err(Error::Config(_))));
}
