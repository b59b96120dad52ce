//! The hub channel contract.
//!
//! A [`HubChannel`] is one persistent connection to one hub. It offers
//! request/response invocation, one-way sends, and push subscriptions.
//! Reconnection after a drop is the channel's own business; consumers
//! only observe it through [`HubChannel::state_changes`].
//!
//! Every frame received on the wire is stamped with a sequence number
//! (`seq`) that increases by one per frame. Pushes and completions
//! share the counter, so a consumer can tell which of a push and a
//! response arrived first.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::trace;

use crate::error::{ConnectionError, InvocationError};

/// Connection state as published by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Never connected.
    Disconnected,
    /// `generation` counts completed reconnects; 0 for the first connect.
    Connected { generation: u32 },
    /// Transport dropped; `attempt` is the current 1-based retry.
    Reconnecting { attempt: u32 },
    /// Released for good, either by `disconnect()` or after giving up.
    Closed,
}

/// A server-initiated event.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    pub seq: u64,
    pub event: String,
    pub payload: Value,
}

/// Successful response to an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub seq: u64,
    pub value: Value,
}

/// Persistent RPC channel to a single hub endpoint.
#[allow(async_fn_in_trait)]
pub trait HubChannel {
    /// Establish the transport. Not retried on failure.
    async fn connect(&mut self) -> Result<(), ConnectionError>;

    /// Start receiving pushes named `event`, in wire order.
    fn subscribe(&self, event: &str) -> Subscription {
        self.subscribe_many(&[event])
    }

    /// One subscription for several events, sharing a single queue so
    /// pushes of different names keep their relative wire order.
    fn subscribe_many(&self, events: &[&str]) -> Subscription;

    /// Send a request and wait for its response.
    async fn invoke(&self, method: &str, args: Value) -> Result<Completion, InvocationError>;

    /// Send a request without waiting for (or expecting) a response.
    async fn notify(&self, method: &str, args: Value) -> Result<(), InvocationError>;

    /// Release the channel. Idempotent; no push is delivered after it
    /// returns.
    async fn disconnect(&mut self);

    /// Watch connection state changes.
    fn state_changes(&self) -> watch::Receiver<ChannelState>;
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

type Subscriber = (u64, mpsc::UnboundedSender<PushEvent>);

/// Fan-out of pushes to live subscriptions, keyed by event name.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    subscribers: DashMap<String, Vec<Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a new subscription for `event`.
    pub fn subscribe(self: &Arc<Self>, event: &str) -> Subscription {
        self.subscribe_many(&[event])
    }

    /// Register one subscription fed by every event in `events`.
    pub fn subscribe_many(self: &Arc<Self>, events: &[&str]) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut names: Vec<String> = Vec::with_capacity(events.len());
        for event in events {
            if names.iter().any(|name| name == event) {
                continue;
            }
            self.subscribers
                .entry(event.to_string())
                .or_default()
                .push((id, tx.clone()));
            names.push(event.to_string());
        }

        Subscription {
            events: names,
            id,
            rx,
            registry: Arc::downgrade(self),
        }
    }

    /// Deliver `push` to every subscription for its event name.
    ///
    /// Returns how many subscriptions received it.
    pub fn dispatch(&self, push: PushEvent) -> usize {
        let Some(subscribers) = self.subscribers.get(&push.event) else {
            trace!(event = %push.event, seq = push.seq, "push without subscribers");
            return 0;
        };

        subscribers
            .iter()
            .filter(|(_, tx)| tx.send(push.clone()).is_ok())
            .count()
    }

    /// Drop every subscription's sender. Pending `recv` calls return `None`.
    pub fn clear(&self) {
        self.subscribers.clear();
    }

    /// Number of live subscriptions across all events.
    pub fn len(&self) -> usize {
        let ids: HashSet<u64> = self
            .subscribers
            .iter()
            .flat_map(|entry| entry.value().iter().map(|(id, _)| *id).collect::<Vec<_>>())
            .collect();
        ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unsubscribe(&self, event: &str, id: u64) {
        if let Some(mut subscribers) = self.subscribers.get_mut(event) {
            subscribers.retain(|(sub_id, _)| *sub_id != id);
        }
        self.subscribers.remove_if(event, |_, subscribers| subscribers.is_empty());
    }
}

/// A live push subscription.
///
/// Acts as its own cancellation token: [`Subscription::cancel`] or
/// dropping it unregisters immediately, and anything still queued is
/// discarded.
#[derive(Debug)]
pub struct Subscription {
    events: Vec<String>,
    id: u64,
    rx: mpsc::UnboundedReceiver<PushEvent>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    /// Event names feeding this subscription.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Next push, or `None` once the channel released this subscription.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.rx.recv().await
    }

    /// Next already-queued push, if any.
    pub fn try_recv(&mut self) -> Option<PushEvent> {
        self.rx.try_recv().ok()
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            for event in &self.events {
                registry.unsubscribe(event, self.id);
            }
        }
    }
}
