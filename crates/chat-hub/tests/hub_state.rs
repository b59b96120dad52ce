// crates/chat-hub/tests/hub_state.rs
use chat_core::{ChatMessage, DisplayName};
use chat_hub::state::HubState;
use chat_protocol::ServerFrame;
use serde_json::{json, Value};

fn announce(state: &mut HubState, name: &str) {
    let outcome = state.handle("announcePresence", json!(name));
    assert_eq!(outcome.reply, Ok(Value::Null));
}

#[test]
fn presence_list_keeps_announcement_order() {
    let mut state = HubState::new();
    announce(&mut state, "alice");
    announce(&mut state, "bob");

    let outcome = state.handle("fetchPresenceList", Value::Null);
    assert_eq!(outcome.reply, Ok(json!(["alice", "bob"])));
    assert!(outcome.broadcast.is_none());
}

#[test]
fn announcement_is_broadcast_as_participant_joined() {
    let mut state = HubState::new();
    let outcome = state.handle("announcePresence", json!("carol"));

    assert_eq!(
        outcome.broadcast,
        Some(ServerFrame::push("participant-joined", json!("carol")))
    );
}

#[test]
fn duplicate_names_are_not_an_error() {
    let mut state = HubState::new();
    announce(&mut state, "alice");
    announce(&mut state, "alice");

    let outcome = state.handle("fetchPresenceList", Value::Null);
    assert_eq!(outcome.reply, Ok(json!(["alice", "alice"])));
}

#[test]
fn sent_message_is_stored_and_broadcast() {
    let mut state = HubState::new();
    let msg = ChatMessage::compose(
        DisplayName::parse("alice").unwrap(),
        "hello room",
        chrono::Utc::now(),
    )
    .unwrap();
    let payload = serde_json::to_value(&msg).unwrap();

    let outcome = state.handle("sendMessage", payload.clone());
    assert_eq!(outcome.reply, Ok(Value::Null));
    assert_eq!(outcome.broadcast, Some(ServerFrame::push("message-posted", payload.clone())));

    let history = state.handle("fetchMessageHistory", Value::Null);
    assert_eq!(history.reply, Ok(json!([payload])));
    assert_eq!(state.messages(), &[msg]);
}

#[test]
fn blank_message_is_rejected_without_broadcast() {
    let mut state = HubState::new();
    let outcome = state.handle(
        "sendMessage",
        json!({"author": "alice", "body": "   ", "sentAt": "2024-05-01T12:00:00Z"}),
    );

    assert!(outcome.reply.is_err());
    assert!(outcome.broadcast.is_none());
    assert!(state.messages().is_empty());
}

#[test]
fn malformed_arguments_are_rejected() {
    let mut state = HubState::new();

    assert!(state.handle("announcePresence", json!(42)).reply.is_err());
    assert!(state.handle("sendMessage", json!("hi")).reply.is_err());
    assert!(state.participants().is_empty());
}

#[test]
fn unknown_method_is_rejected() {
    let mut state = HubState::new();
    let outcome = state.handle("GetUserList", Value::Null);

    assert_eq!(outcome.reply, Err("unknown hub method: GetUserList".to_string()));
}
