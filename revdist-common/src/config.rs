//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a TOML file. Secrets and the source
//! client identity may be overridden from the environment so the file can
//! be shared between hosts.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `REVDIST_CONFIG` environment variable
//! 3. `~/.config/revdist/config.toml`
//! 4. `/etc/revdist/config.toml`

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "REVDIST_CONFIG";
/// Overrides `review.api_key`
pub const REVIEW_API_KEY_ENV_VAR: &str = "REVDIST_REVIEW_API_KEY";
/// Overrides `transfer.api_key`
pub const TRANSFER_API_KEY_ENV_VAR: &str = "REVDIST_TRANSFER_API_KEY";
/// Overrides `transfer.source_client_id`
pub const SOURCE_CLIENT_ENV_VAR: &str = "REVDIST_SOURCE_CLIENT_ID";

/// Locations that never hold bytes reachable from this host
pub const DEFAULT_EXCLUDED_LOCATIONS: &[&str] = &[
    "ftrack.origin",
    "ftrack.connect",
    "ftrack.unmanaged",
    "ftrack.server",
    "ftrack.review",
];

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Review (production tracking) system connection
    pub review: ReviewConfig,

    /// Transfer (file distribution) system connection
    pub transfer: TransferConfig,

    /// Filesystem mounts for review-system locations
    #[serde(default)]
    pub locations: Vec<LocationMount>,

    /// Location names never considered when harvesting
    #[serde(default = "default_excluded_locations")]
    pub excluded_locations: Vec<String>,

    /// HTTP listener for forwarded action events
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Review system connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    /// Base URL, e.g. `https://studio.ftrackapp.com`
    pub server_url: String,
    pub api_user: String,
    #[serde(default)]
    pub api_key: String,
    /// Where user-interface notifications are published
    #[serde(default)]
    pub event_relay_url: Option<String>,
}

/// Transfer system connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub server_url: String,
    pub username: String,
    #[serde(default)]
    pub api_key: String,
    /// Transfer client that serves files from this host's filesystem
    ///
    /// When unset, source paths are handed to the transfer server as-is.
    #[serde(default)]
    pub source_client_id: Option<String>,
}

/// Maps a review-system location onto this host's filesystem
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LocationMount {
    pub name: String,
    pub prefix: PathBuf,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_excluded_locations() -> Vec<String> {
    DEFAULT_EXCLUDED_LOCATIONS.iter().map(|s| s.to_string()).collect()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        Ok(config)
    }

    /// Read and parse a config file, then apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply secret/identity overrides from the environment
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_env(REVIEW_API_KEY_ENV_VAR) {
            self.review.api_key = key;
        }
        if let Some(key) = non_empty_env(TRANSFER_API_KEY_ENV_VAR) {
            self.transfer.api_key = key;
        }
        if let Some(client) = non_empty_env(SOURCE_CLIENT_ENV_VAR) {
            self.transfer.source_client_id = Some(client);
        }
    }

    /// Check the values the action cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.review.server_url.trim().is_empty() {
            return Err(Error::Config("review.server_url is empty".to_string()));
        }
        if self.review.api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "review.api_key is empty (set it in the file or {})",
                REVIEW_API_KEY_ENV_VAR
            )));
        }
        if self.transfer.server_url.trim().is_empty() {
            return Err(Error::Config("transfer.server_url is empty".to_string()));
        }
        if self.transfer.api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "transfer.api_key is empty (set it in the file or {})",
                TRANSFER_API_KEY_ENV_VAR
            )));
        }
        for mount in &self.locations {
            if mount.name.trim().is_empty() || mount.prefix.as_os_str().is_empty() {
                return Err(Error::Config(format!(
                    "Location mount needs both name and prefix: {:?}",
                    mount
                )));
            }
            if self.excluded_locations.contains(&mount.name) {
                warn!(
                    location = %mount.name,
                    "Mounted location is also excluded and will never be used"
                );
            }
        }
        Ok(())
    }

    /// Location name → filesystem prefix
    pub fn location_mounts(&self) -> HashMap<String, PathBuf> {
        self.locations
            .iter()
            .map(|m| (m.name.clone(), m.prefix.clone()))
            .collect()
    }

    /// Source client id, treating an empty string as unset
    pub fn source_client_id(&self) -> Option<&str> {
        self.transfer
            .source_client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Config file resolution
///
/// Returns the first candidate that exists, following the priority order in
/// the module docs. A path given on the command line is returned even if it
/// does not exist so the caller reports it.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Some(path) = non_empty_env(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3/4: user then system config
    let candidates = [
        dirs::config_dir().map(|d| d.join("revdist").join("config.toml")),
        Some(PathBuf::from("/etc/revdist/config.toml")),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|p| p.exists())
        .ok_or_else(|| {
            Error::Config(format!(
                "No config file found (pass --config or set {})",
                CONFIG_ENV_VAR
            ))
        })
}
