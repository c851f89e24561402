//! Client for the stabwire protocol
//!
//! A [`Session`] drives one lock-step channel to a stabilizer simulator,
//! keeps a ledger of the system and state ids it was handed, and validates
//! circuits before sending them. The [`protocols`] module builds
//! measurement-conditioned runs (random bits, superdense coding,
//! teleportation) on top of it.
//!
//! # Example
//!
//! ```rust,no_run
//! use stabwire_client::{ClientConfig, Session, protocols};
//!
//! # async fn demo() -> stabwire_client::CallResult<()> {
//! let config = ClientConfig::from_env();
//! let mut session = Session::connect(&config).await?;
//! let report = protocols::teleport(&mut session, &config.kind, true).await?;
//! assert!(report.succeeded());
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod protocols;
mod session;
mod transport;

pub use config::ClientConfig;
pub use error::{CallError, CallResult, TransportError};
pub use protocols::{Corrections, Phase, TeleportReport, TwoBits, corrections};
pub use session::Session;
pub use transport::{LoopbackTransport, TcpTransport, Transport};

pub use stabwire_circuit::Circuit;
pub use stabwire_proto::{Outcomes, StateId, SystemId};
