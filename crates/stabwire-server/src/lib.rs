//! Reference server for the stabwire protocol
//!
//! Hosts simulated quantum systems, each owning any number of named
//! stabilizer states, and answers NUL-framed JSON requests over TCP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   frames   ┌────────────┐   calls   ┌────────────────┐
//! │ Server (TCP) │ ─────────► │ Dispatcher │ ────────► │ SystemRegistry │
//! │  server.rs   │ ◄───────── │            │ ◄──────── │  engine::chp   │
//! └──────────────┘   replies  └────────────┘  results  └────────────────┘
//! ```
//!
//! The dispatcher also implements [`stabwire_proto::Handler`], so clients can
//! talk to it in-process without a socket.
//!
//! # Example
//!
//! ```rust,no_run
//! use stabwire_server::{Config, Server, shutdown_signal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let server = Server::bind(&config).await?;
//!     server.serve_with_shutdown(shutdown_signal()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod registry;
pub mod server;
pub mod tracing_config;

// Re-export commonly used types
pub use config::{Config, ConfigError, EngineConfig};
pub use dispatcher::Dispatcher;
pub use error::{Result, ServerError};
pub use registry::SystemRegistry;
pub use server::{Server, shutdown_signal};
pub use tracing_config::{TracingConfig, TracingFormat, init_tracing};
