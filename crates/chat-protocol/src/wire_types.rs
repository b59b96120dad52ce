//! Names and constants shared by both ends of the wire.
//!
//! The RPC surface is small and fixed:
//!
//! ```text
//! client → hub   announcePresence     display name        (no response)
//! client → hub   fetchPresenceList    -                   [display name]
//! client → hub   fetchMessageHistory  -                   [ChatMessage]
//! client → hub   sendMessage          ChatMessage         null
//! hub → client   participant-joined   display name        (push)
//! hub → client   message-posted       ChatMessage         (push)
//! ```

use std::fmt;

/// Current protocol version.
///
/// Carried in the first byte of every frame body.
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest accepted frame body, in bytes.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Size of the big-endian length prefix in front of every body.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Methods a client can call on the hub.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HubMethod {
    /// Register the caller's display name. Fire-and-forget.
    AnnouncePresence,

    /// Ordered list of every participant announced so far.
    FetchPresenceList,

    /// Ordered list of every message posted so far.
    FetchMessageHistory,

    /// Post a message to the room.
    SendMessage,
}

impl HubMethod {
    pub const ALL: [HubMethod; 4] = [
        HubMethod::AnnouncePresence,
        HubMethod::FetchPresenceList,
        HubMethod::FetchMessageHistory,
        HubMethod::SendMessage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HubMethod::AnnouncePresence => "announcePresence",
            HubMethod::FetchPresenceList => "fetchPresenceList",
            HubMethod::FetchMessageHistory => "fetchMessageHistory",
            HubMethod::SendMessage => "sendMessage",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for HubMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Push events the hub sends without a matching request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HubEvent {
    /// A participant announced presence. Payload: display name.
    ParticipantJoined,

    /// A message was posted. Payload: `ChatMessage`.
    MessagePosted,
}

impl HubEvent {
    pub const ALL: [HubEvent; 2] = [HubEvent::ParticipantJoined, HubEvent::MessagePosted];

    pub fn as_str(self) -> &'static str {
        match self {
            HubEvent::ParticipantJoined => "participant-joined",
            HubEvent::MessagePosted => "message-posted",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for HubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body length accepted on the wire.
pub fn validate_frame_len(len: usize) -> bool {
    len > 0 && len <= MAX_FRAME_LEN
}
