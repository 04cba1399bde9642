//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::gateway::is_valid_table_name;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub data_source: DataSourceConfig,

    #[serde(default)]
    pub exchange: ExchangeConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote WebSocket endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_path")]
    pub path: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_path() -> String {
    "/ws/advanced".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
        }
    }
}

impl ServerConfig {
    /// Full `ws://` URL of the endpoint
    pub fn endpoint(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }
}

/// Relational data source
#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceConfig {
    /// SQLite database file; must already exist
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_table")]
    pub table: String,
}

fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|p| {
            p.join("snapshot-relay")
                .join("relay.db")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./relay.db".to_string())
}

fn default_table() -> String {
    "actor".to_string()
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            table: default_table(),
        }
    }
}

/// Exchange loop behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Liveness text sent at the start of every cycle
    #[serde(default = "default_probe")]
    pub probe: String,

    /// Close the session after every cycle, as the original client did
    #[serde(default = "default_close_after_cycle")]
    pub close_after_cycle: bool,
}

fn default_probe() -> String {
    "ping".to_string()
}

fn default_close_after_cycle() -> bool {
    true
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            probe: default_probe(),
            close_after_cycle: default_close_after_cycle(),
        }
    }
}

/// Client lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// How long `stop` waits for the loop before aborting it
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

fn default_shutdown_grace() -> u64 {
    2000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: default_shutdown_grace(),
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

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
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

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("snapshot-relay").join("config.toml")),
            Some(PathBuf::from("/etc/snapshot-relay/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `SNAPSHOT_RELAY_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("SNAPSHOT_RELAY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SNAPSHOT_RELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(path) = lookup("SNAPSHOT_RELAY_PATH") {
            self.server.path = path;
        }

        // Data source overrides
        if let Some(db_path) = lookup("SNAPSHOT_RELAY_DB_PATH") {
            self.data_source.path = db_path;
        }
        if let Some(table) = lookup("SNAPSHOT_RELAY_TABLE") {
            self.data_source.table = table;
        }

        // Logging overrides
        if let Some(level) = lookup("SNAPSHOT_RELAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SNAPSHOT_RELAY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject settings that cannot work at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".into()));
        }
        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.path must start with '/': {:?}",
                self.server.path
            )));
        }
        if !is_valid_table_name(&self.data_source.table) {
            return Err(ConfigError::Invalid(format!(
                "data_source.table is not a plain identifier: {:?}",
                self.data_source.table
            )));
        }
        if self.exchange.probe.is_empty() {
            return Err(ConfigError::Invalid("exchange.probe must not be empty".into()));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be \"pretty\" or \"json\": {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
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
    let db_path = toml::Value::String(default_db_path());

    format!(
        r#"# Snapshot Relay Configuration
#
# Environment variables override these settings:
# - SNAPSHOT_RELAY_HOST
# - SNAPSHOT_RELAY_PORT
# - SNAPSHOT_RELAY_PATH
# - SNAPSHOT_RELAY_DB_PATH
# - SNAPSHOT_RELAY_TABLE
# - SNAPSHOT_RELAY_LOG_LEVEL
# - SNAPSHOT_RELAY_LOG_FORMAT

[server]
# WebSocket server host
host = "localhost"

# WebSocket server port
port = 8000

# Endpoint path
path = "/ws/advanced"

[data_source]
# SQLite database file (must exist; opened read-only)
path = {db_path}

# Table sent back on every trigger
table = "actor"

[exchange]
# Liveness text sent at the start of every cycle
probe = "ping"

# Close the connection after every ping/response cycle
close_after_cycle = true

[client]
# How long shutdown waits for the loop before aborting it (ms)
shutdown_grace_ms = 2000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    )
}
