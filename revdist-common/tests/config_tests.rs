//! Integration tests for configuration loading
//!
//! Tests cover:
//! - Loading a full config file from disk
//! - Environment overrides for secrets and source client identity
//! - Config file resolution priority
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate REVDIST_* variables are marked with #[serial].

use revdist_common::config::{
    resolve_config_path, TomlConfig, CONFIG_ENV_VAR, REVIEW_API_KEY_ENV_VAR,
    SOURCE_CLIENT_ENV_VAR, TRANSFER_API_KEY_ENV_VAR,
};
use revdist_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const FULL_CONFIG: &str = r#"
excluded_locations = ["ftrack.server", "ftrack.review"]

[review]
server_url = "https://studio.example.com"
api_user = "bot"
api_key = "file-review-key"
event_relay_url = "http://127.0.0.1:5791"

[transfer]
server_url = "https://studio.transfer.example.com"
username = "bot@studio.com"
api_key = "file-transfer-key"
source_client_id = "5d84a31ace1bf9913a17cc20"

[[locations]]
name = "studio.disk"
prefix = "/mnt/projects"

[[locations]]
name = "studio.archive"
prefix = "/mnt/archive"

[server]
port = 6000

[logging]
level = "debug"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Should create temp file");
    file.write_all(content.as_bytes()).expect("Should write config");
    file
}

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(REVIEW_API_KEY_ENV_VAR);
    env::remove_var(TRANSFER_API_KEY_ENV_VAR);
    env::remove_var(SOURCE_CLIENT_ENV_VAR);
}

#[test]
#[serial]
fn test_load_full_config() {
    clear_env();
    let file = write_config(FULL_CONFIG);

    let config = TomlConfig::load(file.path()).unwrap();

    assert_eq!(config.review.api_key, "file-review-key");
    assert_eq!(config.review.event_relay_url.as_deref(), Some("http://127.0.0.1:5791"));
    assert_eq!(config.source_client_id(), Some("5d84a31ace1bf9913a17cc20"));
    assert_eq!(config.excluded_locations, vec!["ftrack.server", "ftrack.review"]);
    assert_eq!(config.locations.len(), 2);
    assert_eq!(config.server.port, 6000);
    assert_eq!(config.server.bind, "127.0.0.1");
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_env_overrides_secrets_and_source_client() {
    clear_env();
    env::set_var(REVIEW_API_KEY_ENV_VAR, "env-review-key");
    env::set_var(TRANSFER_API_KEY_ENV_VAR, "env-transfer-key");
    env::set_var(SOURCE_CLIENT_ENV_VAR, "env-client");
    let file = write_config(FULL_CONFIG);

    let config = TomlConfig::load(file.path()).unwrap();
    clear_env();

    assert_eq!(config.review.api_key, "env-review-key");
    assert_eq!(config.transfer.api_key, "env-transfer-key");
    assert_eq!(config.source_client_id(), Some("env-client"));
}

#[test]
#[serial]
fn test_missing_api_key_fails_validation() {
    clear_env();
    let file = write_config(&FULL_CONFIG.replace("api_key = \"file-review-key\"", ""));

    let result = TomlConfig::load(file.path());
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("review.api_key")));
}

#[test]
#[serial]
fn test_missing_file_is_config_error() {
    clear_env();
    let result = TomlConfig::load(Path::new("/nonexistent/revdist/config.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_resolve_prefers_cli_argument() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml"))).unwrap();
    clear_env();

    assert_eq!(resolved, PathBuf::from("/tmp/from-cli.toml"));
}

#[test]
#[serial]
fn test_resolve_uses_env_var() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None).unwrap();
    clear_env();

    assert_eq!(resolved, PathBuf::from("/tmp/from-env.toml"));
}
