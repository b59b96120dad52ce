//! Per-connection I/O.
//!
//! Each connection gets a writer task draining its outbound channel
//! and a reader loop that reassembles frames and forwards them to the
//! hub task.

use anyhow::Result;
use bytes::BytesMut;
use chat_protocol::{decode_client_frame, encode_server_frame, split_frame, ServerFrame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::types::{ClientId, ClientRegistry, HubRequest, HubTx, OutboundRx};

/// Run the I/O loop for a single connection.
pub async fn run_client(
    client_id: ClientId,
    stream: TcpStream,
    hub_tx: HubTx,
    out_rx: OutboundRx,
    clients: ClientRegistry,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let (read_stream, write_stream) = stream.into_split();

    let writer_handle = tokio::spawn(run_writer(client_id, write_stream, out_rx));

    let result = run_reader(client_id, read_stream, hub_tx).await;

    // Remove client from registry
    {
        let mut guard = clients.write().await;
        guard.remove(&client_id);
    }
    writer_handle.abort();

    result
}

async fn run_reader(client_id: ClientId, mut read_stream: OwnedReadHalf, hub_tx: HubTx) -> Result<()> {
    let mut buffer = BytesMut::with_capacity(8 * 1024);

    loop {
        while let Some(body) = split_frame(&mut buffer)? {
            let frame = decode_client_frame(&body)?;
            debug!(client = client_id.0, ?frame, "frame");

            if hub_tx.send(HubRequest { client_id, frame }).is_err() {
                warn!("Hub channel closed");
                return Ok(());
            }
        }

        let n = read_stream.read_buf(&mut buffer).await?;
        if n == 0 {
            info!(client = client_id.0, "EOF");
            return Ok(());
        }
    }
}

async fn run_writer(client_id: ClientId, mut write_stream: OwnedWriteHalf, mut out_rx: OutboundRx) {
    let mut buffer = BytesMut::with_capacity(8 * 1024);

    while let Some(frame) = out_rx.recv().await {
        if let Err(e) = write_frame(&mut write_stream, &mut buffer, &frame).await {
            warn!(client = client_id.0, error = %e, "write error");
            break;
        }
    }
}

async fn write_frame(
    stream: &mut OwnedWriteHalf,
    buffer: &mut BytesMut,
    frame: &ServerFrame,
) -> Result<()> {
    buffer.clear();
    encode_server_frame(frame, buffer)?;

    stream.write_all(buffer).await?;
    stream.flush().await?;
    Ok(())
}
