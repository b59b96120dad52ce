//! Chat message type.
//!
//! Messages are immutable once observed. The feed keeps them in
//! arrival order; `sent_at` is informational only and is never used
//! for sorting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::DisplayName;

/// A single chat message as exchanged with the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Display name of the sender.
    pub author: DisplayName,

    /// Message text, exactly as typed.
    pub body: String,

    /// Sender's clock at the time of sending.
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Build an outgoing message.
    ///
    /// A body that is blank after trimming is rejected; otherwise the
    /// body is kept untrimmed.
    pub fn compose(
        author: DisplayName,
        body: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if body.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(ChatMessage {
            author,
            body: body.to_string(),
            sent_at,
        })
    }
}
