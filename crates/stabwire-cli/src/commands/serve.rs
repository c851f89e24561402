//! Serve command: host the reference server in the foreground.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use stabwire_server::{Config, Server, TracingConfig, init_tracing, shutdown_signal};

use super::common::verbosity_filter;

/// Execute the serve command.
pub async fn execute(config_path: Option<&str>, verbose: u8) -> Result<()> {
    let config = Config::load(config_path.map(Path::new)).context("Failed to load configuration")?;

    let mut tracing_config = TracingConfig::from_logging(&config.logging);
    // Without -v the configured level stands.
    if verbose > 0 {
        tracing_config.log_level = verbosity_filter(verbose).to_string();
    }
    init_tracing(tracing_config).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let server = Server::bind(&config).await?;
    println!(
        "{} Serving on {} (Ctrl-C to stop)",
        style("→").cyan().bold(),
        style(server.local_addr()?).green()
    );
    server.serve_with_shutdown(shutdown_signal()).await?;
    Ok(())
}
