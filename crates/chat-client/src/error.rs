// crates/chat-client/src/error.rs

use chat_core::{SnapshotError, ValidationError};
use thiserror::Error;

use crate::session::SessionState;

/// Transport setup failed.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {addr} after {timeout_ms} ms")]
    Timeout { addr: String, timeout_ms: u64 },

    #[error("channel is already connected")]
    AlreadyConnected,

    #[error("channel has been closed")]
    Closed,
}

/// A request was sent (or attempted) but no usable response came back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("channel is not connected")]
    NotConnected,

    #[error("connection lost before a response arrived")]
    ConnectionLost,

    #[error("hub rejected {method}: {message}")]
    Remote { method: String, message: String },

    #[error("malformed response to {method}: {reason}")]
    Malformed { method: String, reason: String },

    #[error("failed to encode arguments for {method}: {reason}")]
    Encode { method: String, reason: String },
}

/// Errors surfaced by [`crate::Session`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("connection failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("request failed: {0}")]
    Invocation(#[from] InvocationError),

    #[error("handshake snapshot rejected: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}
