// crates/chat-client/tests/session.rs
mod common;

use std::time::Duration;

use chat_client::{ChannelState, InvocationError, Session, SessionError, SessionEvent, SessionState};
use chat_core::{DisplayName, ValidationError};
use common::{message_json, scripted, CallKind, ScriptedChannel, ScriptedHub};
use serde_json::json;

fn name(s: &str) -> DisplayName {
    DisplayName::parse(s).unwrap()
}

fn names(session: &Session<ScriptedChannel>) -> Vec<&str> {
    session.presence().iter().map(|n| n.as_str()).collect()
}

fn bodies(session: &Session<ScriptedChannel>) -> Vec<&str> {
    session.feed().iter().map(|m| m.body.as_str()).collect()
}

async fn live_session(as_name: &str) -> (ScriptedHub, Session<ScriptedChannel>) {
    let (hub, channel) = scripted();
    let mut session = Session::new(channel);
    session.join(name(as_name)).await.expect("join");
    (hub, session)
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn third_joiner_sees_existing_participants_in_order() {
    let (hub, channel) = scripted();
    hub.respond("fetchPresenceList", Ok(json!(["alice", "bob"])));

    let mut session = Session::new(channel);
    session.join(name("carol")).await.unwrap();

    assert_eq!(session.state(), SessionState::Live);
    assert_eq!(names(&session), vec!["alice", "bob"]);
    assert!(session.presence().is_seeded());
    assert!(session.feed().is_seeded());
}

#[tokio::test]
async fn handshake_announces_then_fetches_both_snapshots() {
    let (hub, channel) = scripted();
    hub.respond("fetchMessageHistory", Ok(json!([message_json("alice", "hello")])));

    let mut session = Session::new(channel);
    session.join(name("  carol ")).await.unwrap();

    let calls = hub.calls();
    let sequence: Vec<(CallKind, &str)> = calls.iter().map(|c| (c.kind, c.method.as_str())).collect();
    assert_eq!(
        sequence,
        vec![
            (CallKind::Notify, "announcePresence"),
            (CallKind::Invoke, "fetchPresenceList"),
            (CallKind::Invoke, "fetchMessageHistory"),
        ]
    );
    assert_eq!(calls[0].args, json!("carol"));
    assert_eq!(bodies(&session), vec!["hello"]);
    assert_eq!(session.display_name().map(|n| n.as_str()), Some("carol"));
}

#[tokio::test]
async fn subscription_exists_before_the_handshake_starts() {
    let (hub, session) = live_session("carol").await;

    for call in hub.calls() {
        assert_eq!(call.subscribers, 1, "{} ran before subscribing", call.method);
    }
    drop(session);
}

#[tokio::test]
async fn both_events_share_one_queue() {
    let (hub, mut session) = live_session("alice").await;
    assert_eq!(hub.subscribers(), 1);

    // Each push reaches the single subscription once.
    assert_eq!(hub.push("participant-joined", json!("bob")), 1);
    assert_eq!(hub.push("message-posted", message_json("bob", "one")), 1);
    assert_eq!(hub.push("participant-joined", json!("carol")), 1);
    assert_eq!(hub.push("message-posted", message_json("carol", "two")), 1);

    let first = session.next_update().await;
    let mut events = first;
    events.extend(session.pump());

    let order: Vec<String> = events
        .iter()
        .map(|e| match e {
            SessionEvent::ParticipantJoined(who) => format!("joined {}", who),
            SessionEvent::MessagePosted(m) => format!("posted {}", m.body),
            SessionEvent::StateChanged(s) => format!("state {}", s),
        })
        .collect();
    assert_eq!(order, vec!["joined bob", "posted one", "joined carol", "posted two"]);
}

#[tokio::test]
async fn pushes_already_in_a_snapshot_are_not_counted_twice() {
    let (hub, channel) = scripted();
    // carol's own announcement is echoed before the presence snapshot,
    // which already lists her.
    hub.push_before("fetchPresenceList", "participant-joined", json!("carol"));
    hub.respond("fetchPresenceList", Ok(json!(["alice", "carol"])));
    // dave joins after the presence snapshot was taken.
    hub.push_before("fetchMessageHistory", "participant-joined", json!("dave"));
    hub.push_before("fetchMessageHistory", "message-posted", message_json("alice", "old"));
    hub.respond("fetchMessageHistory", Ok(json!([message_json("alice", "old")])));

    let mut session = Session::new(channel);
    session.join(name("carol")).await.unwrap();

    // Nothing queued during the handshake is applied yet.
    assert_eq!(names(&session), vec!["alice", "carol"]);

    let events = session.pump();
    assert_eq!(events, vec![SessionEvent::ParticipantJoined(name("dave"))]);
    assert_eq!(names(&session), vec!["alice", "carol", "dave"]);
    assert_eq!(bodies(&session), vec!["old"]);
}

#[tokio::test]
async fn connect_failure_closes_without_any_invocation() {
    let (hub, channel) = scripted();
    hub.refuse_connect();

    let mut session = Session::new(channel);
    let err = session.join(name("alice")).await.unwrap_err();

    assert!(matches!(err, SessionError::Connection(_)));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(hub.calls().is_empty());
    assert!(session.presence().is_empty());
    assert!(session.pump().is_empty());
}

#[tokio::test]
async fn handshake_failure_is_fatal() {
    let (hub, channel) = scripted();
    hub.respond("fetchMessageHistory", Err(InvocationError::ConnectionLost));

    let mut session = Session::new(channel);
    let err = session.join(name("alice")).await.unwrap_err();

    assert!(matches!(err, SessionError::Invocation(InvocationError::ConnectionLost)));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(hub.disconnects(), 1);
    assert_eq!(hub.connects(), 1);
    assert!(session.presence().is_empty());
    assert!(!session.presence().is_seeded());
    assert!(!session.feed().is_seeded());
}

#[tokio::test]
async fn malformed_snapshot_is_rejected() {
    let (hub, channel) = scripted();
    hub.respond("fetchPresenceList", Ok(json!({"users": ["alice"]})));

    let mut session = Session::new(channel);
    let err = session.join(name("bob")).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Invocation(InvocationError::Malformed { ref method, .. }) if method == "fetchPresenceList"
    ));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.presence().is_empty());
}

#[tokio::test]
async fn join_is_only_allowed_once() {
    let (_hub, mut session) = live_session("alice").await;

    let err = session.join(name("alice")).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidState { state: SessionState::Live, .. }
    ));
}

// ---------------------------------------------------------------------------
// Live pushes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_participant_joined_push_appends_once_in_order() {
    let (hub, channel) = scripted();
    hub.respond("fetchPresenceList", Ok(json!(["alice"])));
    let mut session = Session::new(channel);
    session.join(name("alice")).await.unwrap();

    let joiners = ["bob", "carol", "dave", "erin"];
    for joiner in joiners {
        assert_eq!(hub.push("participant-joined", json!(joiner)), 1);
    }
    session.pump();

    assert_eq!(session.presence().len(), 1 + joiners.len());
    assert_eq!(names(&session), vec!["alice", "bob", "carol", "dave", "erin"]);
}

#[tokio::test]
async fn duplicates_from_the_hub_are_kept() {
    let (hub, mut session) = live_session("alice").await;

    hub.push("participant-joined", json!("bob"));
    hub.push("participant-joined", json!("bob"));
    hub.push("message-posted", message_json("bob", "hi"));
    hub.push("message-posted", message_json("bob", "hi"));
    session.pump();

    assert_eq!(names(&session), vec!["bob", "bob"]);
    assert_eq!(bodies(&session), vec!["hi", "hi"]);
}

#[tokio::test]
async fn pump_reports_events_in_wire_order() {
    let (hub, mut session) = live_session("alice").await;

    hub.push("message-posted", message_json("bob", "first"));
    hub.push("participant-joined", json!("carol"));
    hub.push("message-posted", message_json("carol", "second"));

    let events = session.pump();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            SessionEvent::ParticipantJoined(_) => "joined",
            SessionEvent::MessagePosted(_) => "posted",
            SessionEvent::StateChanged(_) => "state",
        })
        .collect();
    assert_eq!(kinds, vec!["posted", "joined", "posted"]);
}

#[tokio::test]
async fn undecodable_and_unknown_pushes_are_skipped() {
    let (hub, mut session) = live_session("alice").await;

    hub.push("message-posted", json!({"text": "no author"}));
    hub.push("participant-joined", json!(17));
    hub.push("participant-left", json!("bob"));
    hub.push("participant-joined", json!("carol"));

    let events = session.pump();
    assert_eq!(events, vec![SessionEvent::ParticipantJoined(name("carol"))]);
    assert!(session.feed().is_empty());
}

#[tokio::test]
async fn next_update_waits_for_the_next_push() {
    let (hub, mut session) = live_session("alice").await;

    let pusher = hub.clone();
    let (_, events) = tokio::join!(
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            pusher.push("participant-joined", json!("bob"));
        },
        session.next_update()
    );

    assert_eq!(events, vec![SessionEvent::ParticipantJoined(name("bob"))]);
    assert_eq!(names(&session), vec!["bob"]);
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_messages_never_reach_the_hub() {
    let (hub, mut session) = live_session("alice").await;

    for text in ["", "   ", "\t\n"] {
        let err = session.post_message(text).await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(ValidationError::EmptyMessage)));
    }

    assert_eq!(hub.calls_to("sendMessage"), 0);
    assert!(session.feed().is_empty());
}

#[tokio::test]
async fn sent_message_appears_only_when_echoed() {
    let (hub, mut session) = live_session("alice").await;

    session.post_message("hello room").await.unwrap();

    let calls = hub.calls();
    let send = calls.iter().find(|c| c.method == "sendMessage").expect("sendMessage call");
    assert_eq!(send.kind, CallKind::Invoke);
    assert_eq!(send.args["author"], "alice");
    assert_eq!(send.args["body"], "hello room");
    assert!(send.args.get("sentAt").is_some());

    // Success alone does not touch the feed.
    session.pump();
    assert!(session.feed().is_empty());

    hub.push("message-posted", send.args.clone());
    session.pump();
    assert_eq!(bodies(&session), vec!["hello room"]);
    assert_eq!(session.feed().last().map(|m| m.author.as_str()), Some("alice"));
}

#[tokio::test]
async fn failed_send_leaves_the_feed_alone() {
    let (hub, mut session) = live_session("alice").await;
    hub.respond(
        "sendMessage",
        Err(InvocationError::Remote {
            method: "sendMessage".into(),
            message: "nope".into(),
        }),
    );

    let err = session.post_message("hello").await.unwrap_err();

    assert!(matches!(err, SessionError::Invocation(InvocationError::Remote { .. })));
    assert!(session.feed().is_empty());
    assert_eq!(session.state(), SessionState::Live);
}

#[tokio::test]
async fn sending_requires_a_live_session() {
    let (hub, channel) = scripted();
    let mut session = Session::new(channel);

    let err = session.post_message("hi").await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidState { state: SessionState::Idle, .. }));
    assert!(hub.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leave_is_idempotent() {
    let (hub, mut session) = live_session("alice").await;

    session.leave().await;
    session.leave().await;

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(hub.disconnects(), 1);
    assert_eq!(hub.subscribers(), 0);
}

#[tokio::test]
async fn nothing_is_applied_after_leaving() {
    let (hub, mut session) = live_session("alice").await;
    hub.push("participant-joined", json!("bob"));

    session.leave().await;
    assert_eq!(hub.push("participant-joined", json!("carol")), 0);

    assert!(session.pump().is_empty());
    assert!(session.presence().is_empty());
}

#[tokio::test]
async fn reconnect_does_not_rerun_the_handshake() {
    let (hub, mut session) = live_session("alice").await;
    let calls_before = hub.calls().len();

    hub.set_state(ChannelState::Reconnecting { attempt: 1 });
    assert_eq!(
        session.pump(),
        vec![SessionEvent::StateChanged(SessionState::Reconnecting)]
    );

    hub.set_state(ChannelState::Connected { generation: 1 });
    assert_eq!(session.pump(), vec![SessionEvent::StateChanged(SessionState::Live)]);

    assert_eq!(hub.calls().len(), calls_before);
    hub.push("participant-joined", json!("bob"));
    session.pump();
    assert_eq!(names(&session), vec!["bob"]);
}

#[tokio::test]
async fn reconnect_between_two_pumps_is_still_reported() {
    let (hub, mut session) = live_session("alice").await;

    // The watch only keeps the latest value; Reconnecting is never seen.
    hub.set_state(ChannelState::Reconnecting { attempt: 1 });
    hub.set_state(ChannelState::Connected { generation: 1 });

    assert_eq!(
        session.pump(),
        vec![
            SessionEvent::StateChanged(SessionState::Reconnecting),
            SessionEvent::StateChanged(SessionState::Live),
        ]
    );
    assert_eq!(session.state(), SessionState::Live);

    // Same generation again: nothing new happened.
    hub.set_state(ChannelState::Reconnecting { attempt: 1 });
    hub.set_state(ChannelState::Connected { generation: 1 });
    assert!(session.pump().is_empty());
}

#[tokio::test]
async fn posting_while_reconnecting_is_refused() {
    let (hub, mut session) = live_session("alice").await;
    hub.set_state(ChannelState::Reconnecting { attempt: 2 });
    session.pump();

    let err = session.post_message("anyone?").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidState { state: SessionState::Reconnecting, .. }
    ));
    assert_eq!(hub.calls_to("sendMessage"), 0);
}

#[tokio::test]
async fn fatal_channel_close_closes_the_session() {
    let (hub, mut session) = live_session("alice").await;

    hub.push("participant-joined", json!("bob"));
    hub.set_state(ChannelState::Closed);

    let events = session.pump();
    assert_eq!(
        events,
        vec![
            SessionEvent::ParticipantJoined(name("bob")),
            SessionEvent::StateChanged(SessionState::Closed),
        ]
    );
    assert_eq!(session.state(), SessionState::Closed);

    // Already closed: leave has nothing left to release.
    session.leave().await;
    assert_eq!(hub.disconnects(), 0);
}
