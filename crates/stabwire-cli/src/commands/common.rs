//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

use stabwire_circuit::{Circuit, parse};
use stabwire_client::{ClientConfig, LoopbackTransport, Session, TcpTransport, Transport};
use stabwire_server::{Dispatcher, EngineConfig};

use crate::Target;

/// A session over whichever channel the target selects.
pub type CliSession = Session<Box<dyn Transport>>;

/// Open a session to the server, or to an in-process simulator.
pub async fn connect(target: &Target) -> Result<(CliSession, ClientConfig)> {
    let mut config = ClientConfig::from_env();
    if let Some(address) = &target.address {
        config.address.clone_from(address);
    }

    let transport: Box<dyn Transport> = if target.local {
        let dispatcher = Dispatcher::new(EngineConfig::default());
        Box::new(LoopbackTransport::new(Arc::new(dispatcher)))
    } else {
        let tcp = TcpTransport::connect(config.address.as_str(), config.timeout())
            .await
            .with_context(|| format!("Failed to connect to {}", config.address))?;
        Box::new(tcp)
    };

    println!(
        "  Simulator: {}",
        style(transport.describe()).yellow()
    );
    let session = Session::with_delimiter(transport, config.delimiter)?;
    Ok((session, config))
}

/// Close a session, keeping the command's own error if there was one.
pub async fn finish<T>(mut session: CliSession, outcome: Result<T>) -> Result<T> {
    let closed = session.close().await;
    match (outcome, closed) {
        (Err(e), Err(cleanup)) => {
            tracing::warn!(error = %cleanup, "cleanup failed");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(cleanup)) => Err(cleanup).context("Failed to release server resources"),
        (Ok(value), Ok(())) => Ok(value),
    }
}

/// Load a circuit from a file of newline-separated instructions.
pub fn load_circuit(path: &str) -> Result<Circuit> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        anyhow::bail!("File not found: {path}");
    }

    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;
    let circuit = parse(&source, '\n').map_err(|e| anyhow::anyhow!("Parse error in {path}: {e}"))?;
    Ok(circuit)
}

/// Render an outcome string with ones highlighted.
pub fn styled_bits(bits: &str) -> String {
    bits.chars()
        .map(|c| {
            if c == '1' {
                style(c).green().bold().to_string()
            } else {
                style(c).dim().to_string()
            }
        })
        .collect()
}

/// Log filter for a `-v` count: warn, info, debug, then trace.
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
