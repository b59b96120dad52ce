//! Client-side projections of hub state.
//!
//! Both projections are append-only sequences kept in the order the
//! session delivers items. They start empty, may be seeded exactly
//! once with a handshake snapshot, and afterwards only grow through
//! [`PresenceList::append`] / [`MessageFeed::append`].
//!
//! There is no removal: participants who leave stay listed, and no
//! de-duplication is done (an item delivered twice is stored twice).

use std::slice;

use thiserror::Error;

use crate::identity::DisplayName;
use crate::message::ChatMessage;

/// Rejected attempt to seed a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// A snapshot was already applied to this projection.
    #[error("snapshot already applied")]
    AlreadyApplied,

    /// The projection already holds live items.
    #[error("projection is not empty ({0} items)")]
    NotEmpty(usize),
}

/// Shared append-only storage behind both projections.
#[derive(Debug, Clone)]
struct AppendLog<T> {
    items: Vec<T>,
    seeded: bool,
}

impl<T> AppendLog<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            seeded: false,
        }
    }

    fn apply_snapshot(&mut self, snapshot: Vec<T>) -> Result<(), SnapshotError> {
        if self.seeded {
            return Err(SnapshotError::AlreadyApplied);
        }
        if !self.items.is_empty() {
            return Err(SnapshotError::NotEmpty(self.items.len()));
        }
        self.items = snapshot;
        self.seeded = true;
        Ok(())
    }

    fn append(&mut self, item: T) {
        self.items.push(item);
    }
}

impl<T> Default for AppendLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered list of participants seen in the room.
#[derive(Debug, Clone, Default)]
pub struct PresenceList {
    log: AppendLog<DisplayName>,
}

impl PresenceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with the hub's current participant list.
    pub fn apply_snapshot(&mut self, names: Vec<DisplayName>) -> Result<(), SnapshotError> {
        self.log.apply_snapshot(names)
    }

    /// Record one joined participant.
    pub fn append(&mut self, name: DisplayName) {
        self.log.append(name);
    }

    pub fn len(&self) -> usize {
        self.log.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, DisplayName> {
        self.log.items.iter()
    }

    pub fn as_slice(&self) -> &[DisplayName] {
        &self.log.items
    }

    pub fn last(&self) -> Option<&DisplayName> {
        self.log.items.last()
    }

    /// Whether the handshake snapshot has been applied.
    pub fn is_seeded(&self) -> bool {
        self.log.seeded
    }
}

impl<'a> IntoIterator for &'a PresenceList {
    type Item = &'a DisplayName;
    type IntoIter = slice::Iter<'a, DisplayName>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ordered feed of chat messages, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MessageFeed {
    log: AppendLog<ChatMessage>,
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with the hub's message history.
    pub fn apply_snapshot(&mut self, messages: Vec<ChatMessage>) -> Result<(), SnapshotError> {
        self.log.apply_snapshot(messages)
    }

    /// Record one posted message.
    pub fn append(&mut self, message: ChatMessage) {
        self.log.append(message);
    }

    pub fn len(&self) -> usize {
        self.log.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, ChatMessage> {
        self.log.items.iter()
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.log.items
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.log.items.last()
    }

    pub fn is_seeded(&self) -> bool {
        self.log.seeded
    }
}

impl<'a> IntoIterator for &'a MessageFeed {
    type Item = &'a ChatMessage;
    type IntoIter = slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
