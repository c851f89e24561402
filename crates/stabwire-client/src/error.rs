//! Error taxonomy seen by callers of a session.

use thiserror::Error;

use stabwire_proto::{CodecError, FrameError};

/// Failure to move bytes across the channel.
///
/// Any transport error poisons the channel it came from.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No reply within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Connection closed by peer")]
    Closed,

    #[error("Channel is poisoned by an earlier failure")]
    Poisoned,

    #[error("Framing error: {0}")]
    Frame(FrameError),
}

impl From<FrameError> for TransportError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(e) => TransportError::Io(e),
            other => TransportError::Frame(other),
        }
    }
}

/// Errors returned by session and protocol calls.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CallError {
    /// The channel could not deliver the request or receive the reply.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The reply could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with an explicit error.
    #[error("Server error: {0}")]
    Server(String),

    /// The call was rejected locally and never sent.
    #[error("Usage error: {0}")]
    Usage(String),
}

impl CallError {
    pub fn is_transport(&self) -> bool {
        matches!(self, CallError::Transport(_))
    }

    pub fn is_server(&self) -> bool {
        matches!(self, CallError::Server(_))
    }
}

impl From<CodecError> for CallError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Server(message) => CallError::Server(message),
            CodecError::Frame(FrameError::Io(e)) => CallError::Transport(TransportError::Io(e)),
            other => CallError::Protocol(other.to_string()),
        }
    }
}

impl From<stabwire_circuit::ParseError> for CallError {
    fn from(err: stabwire_circuit::ParseError) -> Self {
        CallError::Usage(err.to_string())
    }
}

/// Result type for session calls.
pub type CallResult<T> = Result<T, CallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_mapping() {
        let err: CallError = CodecError::Server("System not found: 3".into()).into();
        assert!(err.is_server());
        assert_eq!(err.to_string(), "Server error: System not found: 3");

        let err: CallError = CodecError::MalformedReply("reply has neither result nor error".into()).into();
        assert!(matches!(err, CallError::Protocol(_)));

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: CallError = CodecError::Frame(FrameError::Io(io)).into();
        assert!(err.is_transport());
    }

    #[test]
    fn test_parse_errors_are_usage() {
        let err: CallError = stabwire_circuit::ParseError::MissingInit.into();
        assert!(matches!(err, CallError::Usage(_)));
    }
}
