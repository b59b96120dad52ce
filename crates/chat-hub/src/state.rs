//! Authoritative room state.
//!
//! `HubState` is pure: it turns one method call into an [`Outcome`]
//! (an optional broadcast plus the caller's reply) and never touches
//! the network. The hub task decides who receives what.

use chat_core::{ChatMessage, DisplayName};
use chat_protocol::{HubEvent, HubMethod, ServerFrame};
use serde_json::Value;

/// Result of handling one method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Push to deliver to every connected client, caller included.
    pub broadcast: Option<ServerFrame>,

    /// Value (or error text) for the caller's completion.
    pub reply: Result<Value, String>,
}

impl Outcome {
    fn reply(value: Value) -> Self {
        Outcome {
            broadcast: None,
            reply: Ok(value),
        }
    }

    fn reject(error: impl Into<String>) -> Self {
        Outcome {
            broadcast: None,
            reply: Err(error.into()),
        }
    }
}

/// Participants and messages, both in arrival order.
#[derive(Debug, Default)]
pub struct HubState {
    participants: Vec<DisplayName>,
    messages: Vec<ChatMessage>,
}

impl HubState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn participants(&self) -> &[DisplayName] {
        &self.participants
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Apply a single method call.
    pub fn handle(&mut self, method: &str, args: Value) -> Outcome {
        let Some(method) = HubMethod::parse(method) else {
            return Outcome::reject(format!("unknown hub method: {}", method));
        };

        match method {
            HubMethod::AnnouncePresence => self.announce_presence(args),
            HubMethod::FetchPresenceList => match serde_json::to_value(&self.participants) {
                Ok(list) => Outcome::reply(list),
                Err(e) => Outcome::reject(format!("failed to encode participants: {}", e)),
            },
            HubMethod::FetchMessageHistory => match serde_json::to_value(&self.messages) {
                Ok(list) => Outcome::reply(list),
                Err(e) => Outcome::reject(format!("failed to encode messages: {}", e)),
            },
            HubMethod::SendMessage => self.send_message(args),
        }
    }

    fn announce_presence(&mut self, args: Value) -> Outcome {
        let name: DisplayName = match serde_json::from_value(args) {
            Ok(name) => name,
            Err(e) => return Outcome::reject(format!("invalid display name: {}", e)),
        };

        let payload = Value::String(name.as_str().to_string());
        self.participants.push(name);

        Outcome {
            broadcast: Some(ServerFrame::push(HubEvent::ParticipantJoined.as_str(), payload)),
            reply: Ok(Value::Null),
        }
    }

    fn send_message(&mut self, args: Value) -> Outcome {
        let message: ChatMessage = match serde_json::from_value(args) {
            Ok(message) => message,
            Err(e) => return Outcome::reject(format!("invalid message: {}", e)),
        };

        if message.body.trim().is_empty() {
            return Outcome::reject("message must not be empty");
        }

        let payload = match serde_json::to_value(&message) {
            Ok(payload) => payload,
            Err(e) => return Outcome::reject(format!("failed to encode message: {}", e)),
        };
        self.messages.push(message);

        Outcome {
            broadcast: Some(ServerFrame::push(HubEvent::MessagePosted.as_str(), payload)),
            reply: Ok(Value::Null),
        }
    }
}
