//! stabwire command-line interface
//!
//! Runs the measurement-conditioned protocols against a remote stabilizer
//! simulator, or against an in-process one with `--local`, and hosts the
//! reference server with `stabwire serve`.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{common, qrng, run, sdc, serve, teleport, version};

/// stabwire - remote stabilizer simulation over NUL-framed JSON
#[derive(Parser)]
#[command(name = "stabwire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where the simulator lives.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Server address (host:port)
    #[arg(short, long, env = "STABWIRE_ADDRESS")]
    address: Option<String>,

    /// Use an in-process simulator instead of a server
    #[arg(long, conflicts_with = "address")]
    local: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw random bits by measuring qubits in superposition
    Qrng {
        /// Qubits per run
        #[arg(short, long, default_value = "8")]
        qubits: usize,

        /// Number of runs
        #[arg(short, long, default_value = "1")]
        runs: u32,

        #[command(flatten)]
        target: Target,
    },

    /// Send two classical bits with one qubit (superdense coding)
    Sdc {
        /// Message to send (0-3)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..4))]
        message: u8,

        #[command(flatten)]
        target: Target,
    },

    /// Teleport a bit from qubit 0 to qubit 2
    Teleport {
        /// Bit to teleport (both when omitted)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..2))]
        bit: Option<u8>,

        #[command(flatten)]
        target: Target,
    },

    /// Run a circuit file
    Run {
        /// Circuit file in the chpext dialect
        #[arg(short, long)]
        input: String,

        /// Circuit that prepares a named state to run the input on
        #[arg(long)]
        state_init: Option<String>,

        #[command(flatten)]
        target: Target,
    },

    /// Run the reference server until interrupted
    Serve {
        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The server installs its own subscriber from its configuration.
    if !matches!(cli.command, Commands::Serve { .. }) {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(common::verbosity_filter(cli.verbose)))
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Qrng {
            qubits,
            runs,
            target,
        } => qrng::execute(&target, qubits, runs).await,

        Commands::Sdc { message, target } => sdc::execute(&target, message).await,

        Commands::Teleport { bit, target } => teleport::execute(&target, bit).await,

        Commands::Run {
            input,
            state_init,
            target,
        } => run::execute(&target, &input, state_init.as_deref()).await,

        Commands::Serve { config } => serve::execute(config.as_deref(), cli.verbose).await,

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
