//! Error types for the chat domain.
//!
//! Only input validation can fail at this layer. Everything that
//! touches the network lives in `chat-client`.

use thiserror::Error;

/// Input rejected before any network call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The chosen display name is empty after trimming.
    #[error("display name must not be empty")]
    EmptyDisplayName,

    /// The message body is empty after trimming.
    #[error("message must not be empty")]
    EmptyMessage,
}
