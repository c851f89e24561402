//! Error types for the reference server.
//!
//! Every variant is reported to the client as the `error` field of a reply;
//! none of them closes the connection.

use thiserror::Error;

use stabwire_circuit::ParseError;
use stabwire_proto::{CodecError, FrameError};

use crate::config::ConfigError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while serving requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// The system id does not name a live system.
    #[error("System not found: {0}")]
    SystemNotFound(String),

    /// The state id does not name a live state of the system.
    #[error("State not found: {state} in system {system}")]
    StateNotFound { system: String, state: String },

    /// The representation kind is not supported.
    #[error("Unsupported state kind: {0}")]
    UnsupportedKind(String),

    /// The circuit failed to parse or validate.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(#[from] ParseError),

    /// `init` asks for more qubits than the engine allows.
    #[error("Register of {requested} qubits exceeds the limit of {max}")]
    TooManyQubits { requested: usize, max: usize },

    /// The request could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error on the listener or a connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for ServerError {
    fn from(err: FrameError) -> Self {
        ServerError::Codec(CodecError::Frame(err))
    }
}
