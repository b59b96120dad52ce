// crates/chat-client/tests/common/mod.rs
//
// Scripted in-memory hub channel for driving a `Session` without a network.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chat_client::{
    ChannelState, Completion, ConnectionError, HubChannel, InvocationError, PushEvent,
    SubscriberRegistry, Subscription,
};
use serde_json::{json, Value};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Invoke,
    Notify,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: CallKind,
    pub method: String,
    pub args: Value,
    /// Live subscriptions at the moment of the call.
    pub subscribers: usize,
}

#[derive(Default)]
struct Script {
    refuse_connect: bool,
    connected: bool,
    responses: HashMap<String, VecDeque<Result<Value, InvocationError>>>,
    pushes_before: HashMap<String, Vec<(String, Value)>>,
    calls: Vec<Call>,
    connects: usize,
    disconnects: usize,
    seq: u64,
}

impl Script {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

/// Test-side handle controlling a [`ScriptedChannel`].
#[derive(Clone)]
pub struct ScriptedHub {
    script: Arc<Mutex<Script>>,
    registry: Arc<SubscriberRegistry>,
    state: Arc<watch::Sender<ChannelState>>,
}

/// `HubChannel` implementation handed to the session under test.
pub struct ScriptedChannel {
    hub: ScriptedHub,
}

pub fn scripted() -> (ScriptedHub, ScriptedChannel) {
    let (state, _) = watch::channel(ChannelState::Disconnected);
    let hub = ScriptedHub {
        script: Arc::new(Mutex::new(Script::default())),
        registry: SubscriberRegistry::new(),
        state: Arc::new(state),
    };
    (hub.clone(), ScriptedChannel { hub })
}

impl ScriptedHub {
    pub fn refuse_connect(&self) {
        self.script.lock().unwrap().refuse_connect = true;
    }

    /// Queue the response to the next call of `method`.
    pub fn respond(&self, method: &str, response: Result<Value, InvocationError>) {
        self.script
            .lock()
            .unwrap()
            .responses
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Deliver `event` on the wire just before the response to `method`.
    pub fn push_before(&self, method: &str, event: &str, payload: Value) {
        self.script
            .lock()
            .unwrap()
            .pushes_before
            .entry(method.to_string())
            .or_default()
            .push((event.to_string(), payload));
    }

    /// Deliver a push now. Returns how many subscriptions got it.
    pub fn push(&self, event: &str, payload: Value) -> usize {
        let seq = self.script.lock().unwrap().next_seq();
        self.registry.dispatch(PushEvent {
            seq,
            event: event.to_string(),
            payload,
        })
    }

    pub fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.method == method).count()
    }

    pub fn connects(&self) -> usize {
        self.script.lock().unwrap().connects
    }

    pub fn disconnects(&self) -> usize {
        self.script.lock().unwrap().disconnects
    }

    pub fn subscribers(&self) -> usize {
        self.registry.len()
    }

    fn record(&self, script: &mut Script, kind: CallKind, method: &str, args: Value) {
        script.calls.push(Call {
            kind,
            method: method.to_string(),
            args,
            subscribers: self.registry.len(),
        });
    }
}

impl HubChannel for ScriptedChannel {
    async fn connect(&mut self) -> Result<(), ConnectionError> {
        let mut script = self.hub.script.lock().unwrap();
        script.connects += 1;
        if script.refuse_connect {
            return Err(ConnectionError::Io {
                addr: "scripted".to_string(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        script.connected = true;
        drop(script);

        self.hub.set_state(ChannelState::Connected { generation: 0 });
        Ok(())
    }

    fn subscribe_many(&self, events: &[&str]) -> Subscription {
        self.hub.registry.subscribe_many(events)
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Completion, InvocationError> {
        let mut script = self.hub.script.lock().unwrap();
        if !script.connected {
            return Err(InvocationError::NotConnected);
        }
        self.hub.record(&mut script, CallKind::Invoke, method, args);

        let early = script.pushes_before.remove(method).unwrap_or_default();
        for (event, payload) in early {
            let seq = script.next_seq();
            self.hub.registry.dispatch(PushEvent { seq, event, payload });
        }

        let seq = script.next_seq();
        let response = script
            .responses
            .get_mut(method)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(default_response(method)));

        response.map(|value| Completion { seq, value })
    }

    async fn notify(&self, method: &str, args: Value) -> Result<(), InvocationError> {
        let mut script = self.hub.script.lock().unwrap();
        if !script.connected {
            return Err(InvocationError::NotConnected);
        }
        self.hub.record(&mut script, CallKind::Notify, method, args);
        Ok(())
    }

    async fn disconnect(&mut self) {
        {
            let mut script = self.hub.script.lock().unwrap();
            script.disconnects += 1;
            script.connected = false;
        }
        self.hub.registry.clear();
        self.hub.set_state(ChannelState::Closed);
    }

    fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.hub.state.subscribe()
    }
}

fn default_response(method: &str) -> Value {
    match method {
        "fetchPresenceList" | "fetchMessageHistory" => json!([]),
        _ => Value::Null,
    }
}

pub fn message_json(author: &str, body: &str) -> Value {
    json!({ "author": author, "body": body, "sentAt": "2024-05-01T12:00:00Z" })
}
