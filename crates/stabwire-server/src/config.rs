//! Configuration management for the stabwire server.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with STABWIRE_ prefix)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Simulation engine limits
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// TCP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:9610")
    #[serde(default = "default_address")]
    pub address: String,

    /// Maximum concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Graceful shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,

    /// Maximum size of one request in bytes (default: 1 MB)
    #[serde(default = "default_max_message_size")]
    pub max_message_size_bytes: usize,
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest register an `init` may declare
    #[serde(default = "default_max_qubits")]
    pub max_qubits: usize,

    /// Seed for measurement randomness; entropy when unset
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_address() -> String {
    "127.0.0.1:9610".to_string()
}

fn default_max_connections() -> usize {
    256
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_max_message_size() -> usize {
    stabwire_proto::frame::DEFAULT_MAX_MESSAGE_SIZE
}

fn default_max_qubits() -> usize {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: default_address(),
            max_connections: default_max_connections(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
            max_message_size_bytes: default_max_message_size(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_qubits: default_max_qubits(),
            rng_seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load from file if provided
    /// 2. Apply environment variable overrides
    /// 3. Load .env file if it exists
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        let config = config.merge_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    ///
    /// Only variables that are set override the file-loaded (or default)
    /// values; unparsable numbers are ignored.
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Server
        if let Some(v) = lookup("STABWIRE_ADDRESS") {
            self.server.address = v;
        }
        if let Some(val) = lookup("STABWIRE_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.server.max_connections = val;
        }
        if let Some(val) = lookup("STABWIRE_SHUTDOWN_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.server.shutdown_timeout_seconds = val;
        }
        if let Some(val) = lookup("STABWIRE_MAX_MESSAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.server.max_message_size_bytes = val;
        }

        // Engine
        if let Some(val) = lookup("STABWIRE_MAX_QUBITS").and_then(|v| v.parse().ok()) {
            self.engine.max_qubits = val;
        }
        if let Some(val) = lookup("STABWIRE_RNG_SEED").and_then(|v| v.parse().ok()) {
            self.engine.rng_seed = Some(val);
        }

        // Logging
        if let Some(v) = lookup("STABWIRE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("STABWIRE_LOG_FORMAT") {
            self.logging.format = v;
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_address()?;

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        if self.server.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "max_connections must be greater than 0".to_string(),
            ));
        }
        if self.server.max_message_size_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_message_size_bytes must be greater than 0".to_string(),
            ));
        }
        if self.engine.max_qubits == 0 {
            return Err(ConfigError::ValidationError(
                "max_qubits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the parsed listener address.
    pub fn socket_address(&self) -> Result<SocketAddr, ConfigError> {
        self.server.address.parse().map_err(|_| {
            ConfigError::ValidationError(format!("Invalid server address: {}", self.server.address))
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
