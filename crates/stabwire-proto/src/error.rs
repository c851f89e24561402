//! Error types for encoding and decoding wire messages.

use thiserror::Error;

/// Errors raised while reading or writing one framed message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// The message does not end with the NUL terminator.
    #[error("Message is not terminated by a NUL byte")]
    MissingTerminator,

    /// The message exceeded the configured size limit and was discarded.
    #[error("Message exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The peer closed the stream in the middle of a message.
    #[error("Connection closed mid-message after {received} bytes")]
    UnexpectedEof { received: usize },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the message codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// Framing failed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The payload is not valid JSON, or has the wrong JSON shape.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The method name is not part of the protocol.
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// Parameters have the wrong count or type for the method.
    #[error("Invalid parameters for {method}: {reason}")]
    InvalidParameters { method: String, reason: String },

    /// A reply is well-formed JSON but not a valid reply.
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// The reply carries an explicit `error` field.
    #[error("Server error: {0}")]
    Server(String),
}

impl CodecError {
    /// True if the peer reported the failure, as opposed to the message
    /// being unreadable.
    pub fn is_server_error(&self) -> bool {
        matches!(self, CodecError::Server(_))
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
