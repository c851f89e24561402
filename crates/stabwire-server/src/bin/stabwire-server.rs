//! stabwire reference server binary.
//!
//! # Configuration
//!
//! - first argument: optional path to a YAML config file
//! - `STABWIRE_*` environment variables override the file (see `Config::merge_env`)
//! - `RUST_LOG` overrides the configured log level

use std::path::PathBuf;
use tracing::info;

use stabwire_server::{Config, Server, TracingConfig, init_tracing, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    init_tracing(TracingConfig::from_logging(&config.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    info!(?config, "Starting stabwire server");

    let server = Server::bind(&config).await?;
    server.serve_with_shutdown(shutdown_signal()).await?;
    Ok(())
}
