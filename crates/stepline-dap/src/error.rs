//! Error types for the DAP client engine

use crate::command::Command;
use crate::state::ConnectionState;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Framing, JSON, or schema violation on the wire. Fatal to the session.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A frame parsed as JSON but is not a DAP response or event
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// An operation that needs a live adapter was called before `spawn`
    #[error("adapter not spawned")]
    AdapterNotSpawned,

    /// `spawn` was called while an adapter is already running
    #[error("adapter already spawned")]
    AdapterAlreadySpawned,

    /// A send was attempted in a connection state that does not allow the
    /// command; the request stays queued and is retried next tick
    #[error("adapter not done initializing: `{command}` is not sendable in state {state:?}")]
    AdapterNotDoneInitializing {
        command: Command,
        state: ConnectionState,
    },

    /// The adapter did not advertise the capability that guards the command
    #[error("adapter does not support request `{0}`")]
    AdapterDoesNotSupportRequest(Command),

    /// A queued request's dependency is not satisfied yet; retried next tick
    #[error("dependency not satisfied for request seq {0}")]
    DependencyNotSatisfied(i64),

    /// The adapter answered with `success: false`
    #[error("request `{command}` (seq {request_seq}) failed: {message}")]
    RequestFailed {
        command: Command,
        request_seq: i64,
        message: String,
    },

    /// `request_seq` or `command` of a response disagrees with what was
    /// sent. Fatal to the session.
    #[error("request/response mismatch: {0}")]
    RequestResponseMismatch(String),

    /// Correlation miss: no queued response for the requested seq
    #[error("no response queued for request seq {0}")]
    ResponseDoesNotExist(i64),

    /// Correlation miss: no queued event matching the requested key
    #[error("no queued event matching {0}")]
    EventDoesNotExist(String),

    /// A session-level operation was called before launch/attach completed
    #[error("session not started")]
    SessionNotStarted,

    /// Process I/O or stream failure talking to the adapter
    #[error("adapter communication error: {0}")]
    Communication(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Communication(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidMessage(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Protocol(format!("invalid UTF-8 in frame body: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_command() {
        let err = Error::AdapterDoesNotSupportRequest(Command::Terminate);
        assert_eq!(err.to_string(), "adapter does not support request `terminate`");
    }

    #[test]
    fn io_error_maps_to_communication() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io.into();
        assert!(matches!(err, Error::Communication(_)));
    }

    #[test]
    fn serde_error_maps_to_invalid_message() {
        let parse = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }
}
