//! chat-core
//!
//! Pure chat room domain logic:
//! - identity (display names)
//! - chat messages
//! - client-side projections (presence list, message feed)
//! - validation errors

pub mod identity;
pub mod message;
pub mod projection;
pub mod error;

pub use identity::DisplayName;
pub use message::ChatMessage;
pub use projection::{MessageFeed, PresenceList, SnapshotError};
pub use error::ValidationError;
