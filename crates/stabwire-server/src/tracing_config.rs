//! Logging setup for the server.
//!
//! Console output for development, JSON lines for production.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output (for development).
    Console,
    /// JSON structured logging (for production).
    Json,
}

impl TracingFormat {
    fn from_name(name: &str) -> Self {
        match name {
            "json" => TracingFormat::Json,
            _ => TracingFormat::Console,
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "debug", "stabwire_server=trace").
    pub log_level: String,
    /// Output format (console or JSON).
    pub format: TracingFormat,
    /// Service name attached to the startup event.
    pub service_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: TracingFormat::Console,
            service_name: "stabwire-server".to_string(),
        }
    }
}

impl TracingConfig {
    /// Create config from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_LOG`: Log level (default: "info")
    /// - `STABWIRE_LOG_FORMAT`: "console" or "json" (default: "console")
    /// - `STABWIRE_SERVICE_NAME`: Service name (default: "stabwire-server")
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            format: lookup("STABWIRE_LOG_FORMAT").map_or(defaults.format, |f| TracingFormat::from_name(&f)),
            service_name: lookup("STABWIRE_SERVICE_NAME").unwrap_or(defaults.service_name),
        }
    }

    /// Build from the `logging` section of the server configuration.
    ///
    /// `RUST_LOG`, when set, still takes precedence over the configured level.
    pub fn from_logging(logging: &LoggingConfig) -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone()),
            format: TracingFormat::from_name(&logging.format),
            ..Self::default()
        }
    }
}

/// Initialize the global subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match config.format {
        TracingFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .boxed(),
        TracingFormat::Json => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(service = %config.service_name, "Tracing initialized");
    Ok(())
}
