//! Shared types for the hub server.
//!
//! - `ClientId`: a lightweight handle for connected clients
//! - channel aliases between connection tasks and the hub task
//! - `HubRequest`: frames flowing from connections to the hub task

use std::collections::HashMap;
use std::sync::Arc;

use chat_protocol::{ClientFrame, ServerFrame};
use tokio::sync::mpsc;
use tokio::sync::RwLock;

/// Identifier for a connected client, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Outbound frames from the hub to a given client.
pub type OutboundTx = mpsc::UnboundedSender<ServerFrame>;
pub type OutboundRx = mpsc::UnboundedReceiver<ServerFrame>;

/// Registry of connected clients and their outbound channels.
pub type ClientRegistry = Arc<RwLock<HashMap<ClientId, OutboundTx>>>;

/// Frame received from a client, tagged with its origin.
#[derive(Debug)]
pub struct HubRequest {
    pub client_id: ClientId,
    pub frame: ClientFrame,
}

/// Channel from connections → hub task.
pub type HubTx = mpsc::UnboundedSender<HubRequest>;
pub type HubRx = mpsc::UnboundedReceiver<HubRequest>;
