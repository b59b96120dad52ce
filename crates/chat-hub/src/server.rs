//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections and assigns each a `ClientId`.
//! - Spawns a per-client I/O task and a single hub task that owns
//!   the room state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::client;
use crate::config::Config;
use crate::hub_task;
use crate::types::{ClientId, ClientRegistry, HubRx, HubTx, OutboundRx, OutboundTx};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Bind to the configured address and serve forever.
pub async fn run(config: Config) -> Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Listening");

    serve(listener, config.max_clients).await
}

/// Serve connections accepted on an already bound listener.
pub async fn serve(listener: TcpListener, max_clients: usize) -> Result<()> {
    // Shared registry of clients → outbound channels.
    let clients: ClientRegistry = Arc::new(tokio::sync::RwLock::new(Default::default()));

    // Channel from clients → hub task.
    let (hub_tx, hub_rx): (HubTx, HubRx) = mpsc::unbounded_channel();

    {
        let clients_clone = clients.clone();
        tokio::spawn(async move {
            hub_task::run_hub_loop(hub_rx, clients_clone).await;
        });
    }

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let current_clients = {
            let guard = clients.read().await;
            guard.len()
        };

        if current_clients >= max_clients {
            warn!(%peer_addr, max_clients, "Rejecting connection: max_clients reached");
            // Dropping the stream closes it.
            continue;
        }

        let client_id = next_client_id();
        info!(client = client_id.0, %peer_addr, "Accepted connection");

        let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
        {
            let mut guard = clients.write().await;
            guard.insert(client_id, out_tx);
        }

        let clients_clone = clients.clone();
        let hub_tx_clone = hub_tx.clone();

        tokio::spawn(async move {
            match client::run_client(client_id, stream, hub_tx_clone, out_rx, clients_clone).await {
                Ok(()) => info!(client = client_id.0, "Client disconnected"),
                Err(e) => warn!(client = client_id.0, error = %e, "Client error"),
            }
        });
    }
}
