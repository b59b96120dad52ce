//! Central hub loop.
//!
//! This task owns the `HubState` and processes every `HubRequest`
//! from every connection, one at a time.
//!
//! Routing policy:
//! - pushes caused by a request are broadcast to **all** clients,
//!   the caller included;
//! - the completion of an `invoke` goes **only** to the caller, queued
//!   after the broadcast so every client observes the same order;
//! - `send` requests get no completion; failures are only logged.

use std::collections::HashMap;

use chat_protocol::{ClientFrame, ServerFrame};
use tracing::{debug, info, warn};

use crate::state::HubState;
use crate::types::{ClientId, ClientRegistry, HubRequest, HubRx, OutboundTx};

/// Run the central hub processing loop.
///
/// - `hub_rx`: receives requests from all connection tasks.
/// - `clients`: registry of connected clients and their outbound channels.
pub async fn run_hub_loop(mut hub_rx: HubRx, clients: ClientRegistry) {
    let mut state = HubState::new();

    while let Some(req) = hub_rx.recv().await {
        let HubRequest { client_id, frame } = req;

        match frame {
            ClientFrame::Ping => {
                let current_clients = clients.read().await;
                unicast(client_id, ServerFrame::Pong, &current_clients);
            }
            ClientFrame::Send { method, args } => {
                debug!(client = client_id.0, %method, "send");
                let outcome = state.handle(&method, args);

                if let Err(e) = &outcome.reply {
                    warn!(client = client_id.0, %method, error = %e, "one-way request rejected");
                }
                if let Some(push) = outcome.broadcast {
                    let current_clients = snapshot(&clients).await;
                    broadcast(push, &current_clients);
                }
            }
            ClientFrame::Invoke { id, method, args } => {
                debug!(client = client_id.0, id, %method, "invoke");
                let outcome = state.handle(&method, args);

                let current_clients = snapshot(&clients).await;
                if let Some(push) = outcome.broadcast {
                    broadcast(push, &current_clients);
                }

                let completion = match outcome.reply {
                    Ok(value) => ServerFrame::success(id, value),
                    Err(e) => {
                        warn!(client = client_id.0, id, %method, error = %e, "invocation rejected");
                        ServerFrame::failure(id, e)
                    }
                };
                unicast(client_id, completion, &current_clients);
            }
        }
    }

    info!(
        participants = state.participants().len(),
        messages = state.messages().len(),
        "Hub loop shutting down (hub_rx closed)"
    );
}

/// Snapshot of current clients to minimize lock hold time.
async fn snapshot(clients: &ClientRegistry) -> HashMap<ClientId, OutboundTx> {
    let guard = clients.read().await;
    guard.clone()
}

fn broadcast(frame: ServerFrame, clients: &HashMap<ClientId, OutboundTx>) {
    for tx in clients.values() {
        let _ = tx.send(frame.clone());
    }
}

fn unicast(client_id: ClientId, frame: ServerFrame, clients: &HashMap<ClientId, OutboundTx>) {
    if let Some(tx) = clients.get(&client_id) {
        let _ = tx.send(frame);
    }
}
