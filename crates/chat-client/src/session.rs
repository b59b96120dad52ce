//! Session synchronization.
//!
//! A [`Session`] owns the hub channel and the two projections
//! (presence list, message feed) and is the only thing that mutates
//! them. Its lifecycle:
//!
//! ```text
//! Idle → Connecting → Handshaking → Live ⇄ Reconnecting
//!   any state → Closed (leave, or a fatal channel error)
//! ```
//!
//! Startup subscribes to pushes *before* the handshake so nothing that
//! happens while the snapshots are fetched is lost. Both events share
//! one subscription, so they are applied in the order they hit the wire. Pushes queued
//! during the handshake are only applied after the session is `Live`,
//! and those that reached the wire before the matching snapshot
//! response are dropped: the hub already counted them in the snapshot.
//!
//! After an automatic reconnect the handshake is not re-run, so events
//! emitted while the transport was down are not backfilled.

use std::fmt;

use chat_core::{ChatMessage, DisplayName, MessageFeed, PresenceList, ValidationError};
use chat_protocol::{HubEvent, HubMethod};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelState, Completion, HubChannel, PushEvent, Subscription};
use crate::error::{InvocationError, SessionError};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Handshaking,
    Live,
    Reconnecting,
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Handshaking => "handshaking",
            SessionState::Live => "live",
            SessionState::Reconnecting => "reconnecting",
            SessionState::Closed => "closed",
        }
    }

    /// Live or temporarily reconnecting.
    pub fn is_joined(self) -> bool {
        matches!(self, SessionState::Live | SessionState::Reconnecting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that changed as a result of pumping the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ParticipantJoined(DisplayName),
    MessagePosted(ChatMessage),
    StateChanged(SessionState),
}

/// One participant's view of the room.
pub struct Session<C: HubChannel> {
    channel: C,
    state: SessionState,
    display_name: Option<DisplayName>,
    presence: PresenceList,
    feed: MessageFeed,
    pushes: Option<Subscription>,
    channel_state: watch::Receiver<ChannelState>,
    /// Wire sequence of the presence snapshot; earlier pushes are in it.
    presence_watermark: u64,
    /// Wire sequence of the history snapshot.
    feed_watermark: u64,
    /// Pushes taken off the subscription but not yet applied.
    backlog: Vec<PushEvent>,
    /// Reconnect generation of the transport we last saw connected.
    generation: u32,
}

enum Wake {
    Push(PushEvent),
    ChannelState,
    Exhausted,
}

impl<C: HubChannel> Session<C> {
    pub fn new(channel: C) -> Self {
        let channel_state = channel.state_changes();

        Self {
            channel,
            state: SessionState::Idle,
            display_name: None,
            presence: PresenceList::new(),
            feed: MessageFeed::new(),
            pushes: None,
            channel_state,
            presence_watermark: 0,
            feed_watermark: 0,
            backlog: Vec::new(),
            generation: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn display_name(&self) -> Option<&DisplayName> {
        self.display_name.as_ref()
    }

    pub fn presence(&self) -> &PresenceList {
        &self.presence
    }

    pub fn feed(&self) -> &MessageFeed {
        &self.feed
    }

    /// Connect, subscribe, and run the join handshake as `name`.
    ///
    /// Any failure closes the session; nothing is retried.
    pub async fn join(&mut self, name: DisplayName) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                operation: "join",
                state: self.state,
            });
        }
        self.display_name = Some(name.clone());

        self.set_state(SessionState::Connecting);
        if let Err(e) = self.channel.connect().await {
            error!(error = %e, "Could not connect to hub");
            self.set_state(SessionState::Closed);
            return Err(e.into());
        }
        // Transitions up to here were our own doing.
        if let ChannelState::Connected { generation } = *self.channel_state.borrow_and_update() {
            self.generation = generation;
        }

        self.pushes = Some(self.channel.subscribe_many(&[
            HubEvent::ParticipantJoined.as_str(),
            HubEvent::MessagePosted.as_str(),
        ]));

        self.set_state(SessionState::Handshaking);
        if let Err(e) = self.handshake(&name).await {
            error!(error = %e, "Handshake failed");
            self.shutdown().await;
            return Err(e);
        }

        self.set_state(SessionState::Live);
        info!(
            name = %name,
            participants = self.presence.len(),
            messages = self.feed.len(),
            "Joined room"
        );
        Ok(())
    }

    async fn handshake(&mut self, name: &DisplayName) -> Result<(), SessionError> {
        let announce = HubMethod::AnnouncePresence.as_str();
        if let Err(e) = self
            .channel
            .notify(announce, Value::String(name.as_str().to_string()))
            .await
        {
            // The snapshot requests below surface a dead channel.
            warn!(error = %e, "Presence announcement not sent");
        }

        let presence = self.channel.invoke(HubMethod::FetchPresenceList.as_str(), Value::Null).await?;
        let (presence_seq, names) =
            decode_completion::<Vec<DisplayName>>(HubMethod::FetchPresenceList, presence)?;

        let history = self.channel.invoke(HubMethod::FetchMessageHistory.as_str(), Value::Null).await?;
        let (history_seq, messages) =
            decode_completion::<Vec<ChatMessage>>(HubMethod::FetchMessageHistory, history)?;

        // Both snapshots decoded; apply them together.
        self.presence.apply_snapshot(names)?;
        self.feed.apply_snapshot(messages)?;
        self.presence_watermark = presence_seq;
        self.feed_watermark = history_seq;

        Ok(())
    }

    /// Apply everything already queued, without waiting.
    ///
    /// Pushes are applied in wire order. Channel state changes are
    /// observed afterwards.
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.state.is_joined() {
            return events;
        }

        if let Some(pushes) = self.pushes.as_mut() {
            while let Some(push) = pushes.try_recv() {
                self.backlog.push(push);
            }
        }

        // One queue, already in wire order.
        let backlog = std::mem::take(&mut self.backlog);
        for push in backlog {
            if let Some(event) = self.apply_push(push) {
                events.push(event);
            }
        }

        self.observe_channel_state(&mut events);
        events
    }

    /// Wait for the next push or channel state change and apply it
    /// (plus anything else already queued).
    ///
    /// Never resolves while the session is not joined.
    pub async fn next_update(&mut self) -> Vec<SessionEvent> {
        loop {
            if !self.state.is_joined() {
                return std::future::pending().await;
            }

            let wake = {
                let Self {
                    pushes,
                    channel_state,
                    ..
                } = self;
                let Some(pushes) = pushes.as_mut() else {
                    return std::future::pending().await;
                };

                tokio::select! {
                    Some(push) = pushes.recv() => Wake::Push(push),
                    Ok(()) = channel_state.changed() => Wake::ChannelState,
                    else => Wake::Exhausted,
                }
            };

            match wake {
                Wake::Push(push) => self.backlog.push(push),
                Wake::ChannelState => {}
                Wake::Exhausted => {
                    warn!("Hub channel went away");
                    self.pushes = None;
                    self.set_state(SessionState::Closed);
                    return vec![SessionEvent::StateChanged(SessionState::Closed)];
                }
            }

            let events = self.pump();
            if !events.is_empty() {
                return events;
            }
        }
    }

    /// Send a chat message.
    ///
    /// The feed is not touched here: the message shows up once the hub
    /// echoes it back as a push, in the same order everyone sees it.
    pub async fn post_message(&mut self, text: &str) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let author = match (&self.display_name, self.state) {
            (Some(name), SessionState::Live) => name.clone(),
            (_, state) => {
                warn!(%state, "Cannot send message: session is not live");
                return Err(SessionError::InvalidState {
                    operation: "post a message",
                    state,
                });
            }
        };

        let message = ChatMessage::compose(author, text, chrono::Utc::now())?;
        let method = HubMethod::SendMessage.as_str();
        let args = serde_json::to_value(&message).map_err(|e| InvocationError::Encode {
            method: method.to_string(),
            reason: e.to_string(),
        })?;

        match self.channel.invoke(method, args).await {
            Ok(_) => {
                debug!(len = text.len(), "Message sent; waiting for echo");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to send message");
                Err(e.into())
            }
        }
    }

    /// Leave the room. Safe to call more than once.
    pub async fn leave(&mut self) {
        if self.state == SessionState::Closed {
            debug!("leave: session already closed");
            return;
        }

        self.shutdown().await;
        info!("Left room");
    }

    async fn shutdown(&mut self) {
        // Cancel the subscription first so nothing else is queued.
        self.pushes = None;
        self.backlog.clear();
        self.channel.disconnect().await;
        self.set_state(SessionState::Closed);
    }

    fn apply_push(&mut self, push: PushEvent) -> Option<SessionEvent> {
        match HubEvent::parse(&push.event) {
            Some(HubEvent::ParticipantJoined) => {
                if push.seq < self.presence_watermark {
                    debug!(seq = push.seq, "participant already in snapshot");
                    return None;
                }
                let name: DisplayName = decode_push(&push)?;
                self.presence.append(name.clone());
                Some(SessionEvent::ParticipantJoined(name))
            }
            Some(HubEvent::MessagePosted) => {
                if push.seq < self.feed_watermark {
                    debug!(seq = push.seq, "message already in history");
                    return None;
                }
                let message: ChatMessage = decode_push(&push)?;
                self.feed.append(message.clone());
                Some(SessionEvent::MessagePosted(message))
            }
            None => {
                warn!(event = %push.event, "Ignoring unexpected push");
                None
            }
        }
    }

    fn observe_channel_state(&mut self, events: &mut Vec<SessionEvent>) {
        if !self.channel_state.has_changed().unwrap_or(false) {
            return;
        }
        let channel_state = *self.channel_state.borrow_and_update();

        match (self.state, channel_state) {
            (SessionState::Live, ChannelState::Reconnecting { attempt }) => {
                warn!(attempt, "Connection dropped; reconnecting");
                self.transition(SessionState::Reconnecting, events);
            }
            (SessionState::Reconnecting, ChannelState::Connected { generation }) => {
                self.generation = generation;
                warn!(generation, "Reconnected; events missed while disconnected are not backfilled");
                self.transition(SessionState::Live, events);
            }
            // Dropped and came back between two looks at the channel.
            (SessionState::Live, ChannelState::Connected { generation }) if generation != self.generation => {
                self.generation = generation;
                warn!(generation, "Reconnected; events missed while disconnected are not backfilled");
                self.transition(SessionState::Reconnecting, events);
                self.transition(SessionState::Live, events);
            }
            (_, ChannelState::Closed) | (_, ChannelState::Disconnected) => {
                error!("Hub channel closed");
                self.pushes = None;
                self.transition(SessionState::Closed, events);
            }
            _ => {}
        }
    }

    fn transition(&mut self, next: SessionState, events: &mut Vec<SessionEvent>) {
        if next != self.state {
            self.set_state(next);
            events.push(SessionEvent::StateChanged(next));
        }
    }

    fn set_state(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }
}

fn decode_completion<T: DeserializeOwned>(
    method: HubMethod,
    completion: Completion,
) -> Result<(u64, T), InvocationError> {
    let value = serde_json::from_value(completion.value).map_err(|e| InvocationError::Malformed {
        method: method.as_str().to_string(),
        reason: e.to_string(),
    })?;
    Ok((completion.seq, value))
}

fn decode_push<T: DeserializeOwned>(push: &PushEvent) -> Option<T> {
    match serde_json::from_value(push.payload.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(event = %push.event, seq = push.seq, error = %e, "Dropping undecodable push");
            None
        }
    }
}
