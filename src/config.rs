//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::websocket::{ConnectionSettings, HubConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubSection,

    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Port used when neither `PORT` nor `--port` says otherwise
pub const DEFAULT_PORT: u16 = 18081;

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubSection {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Per-connection deadlines
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSection {
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

fn default_read_timeout() -> u64 {
    60
}

fn default_ping_interval() -> u64 {
    30
}

fn default_write_timeout() -> u64 {
    10
}

fn default_max_message_bytes() -> usize {
    8 * 1024 * 1024 // 8 MiB
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            read_timeout_secs: default_read_timeout(),
            ping_interval_secs: default_ping_interval(),
            write_timeout_secs: default_write_timeout(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Candidate config files, in the order they are tried
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("remote-relay").join("config.toml")),
            Some(PathBuf::from("/etc/remote-relay/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load from default locations or environment.
    ///
    /// The first existing file wins and must parse; a broken file is an
    /// error, not a silent fallback. Returns the file used, if any.
    pub fn load_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_first(&Self::default_paths())
    }

    fn load_first(candidates: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Ok((Self::load_with_env(path)?, Some(path.clone()))),
            None => Ok((Self::from_env(), None)),
        }
    }

    /// Apply `--port`, which only counts when `PORT` is unset or empty
    pub fn apply_cli_port(&mut self, port: Option<u16>) {
        self.apply_cli_port_with(port, env_var);
    }

    fn apply_cli_port_with(&mut self, port: Option<u16>, var: impl Fn(&str) -> Option<String>) {
        if var("PORT").is_some() {
            return;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_var);
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("RELAY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(capacity) = var("RELAY_QUEUE_CAPACITY").and_then(|c| c.parse().ok()) {
            self.hub.queue_capacity = capacity;
        }
        if let Some(level) = var("RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("RELAY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "hub.queue_capacity must be at least 1".to_string(),
            ));
        }
        let conn = &self.connection;
        if conn.read_timeout_secs == 0 || conn.write_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connection timeouts must be positive".to_string(),
            ));
        }
        if conn.ping_interval_secs == 0 || conn.ping_interval_secs >= conn.read_timeout_secs {
            return Err(ConfigError::Invalid(format!(
                "connection.ping_interval_secs ({}) must be positive and below read_timeout_secs ({})",
                conn.ping_interval_secs, conn.read_timeout_secs
            )));
        }
        Ok(())
    }

    /// Registry settings
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            queue_capacity: self.hub.queue_capacity,
        }
    }

    /// Per-connection deadlines
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            read_timeout: Duration::from_secs(self.connection.read_timeout_secs),
            ping_interval: Duration::from_secs(self.connection.ping_interval_secs),
            write_timeout: Duration::from_secs(self.connection.write_timeout_secs),
            max_message_bytes: self.connection.max_message_bytes,
        }
    }
}

/// Environment variable, with an empty value treated as unset
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Remote Relay Configuration
#
# Environment variables override these settings:
# - RELAY_HOST
# - PORT
# - RELAY_QUEUE_CAPACITY
# - RELAY_LOG_LEVEL
# - RELAY_LOG_FORMAT

[server]
# Address to bind
host = "0.0.0.0"

# Listen port
port = 18081

[hub]
# Frames buffered per connection before new ones are dropped
queue_capacity = 16

[connection]
# Drop a connection that sends nothing (not even a pong) for this long
read_timeout_secs = 60

# Ping interval, must be below read_timeout_secs
ping_interval_secs = 30

# Deadline for writing a single frame
write_timeout_secs = 10

# Largest inbound frame (bytes)
max_message_bytes = 8388608

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
