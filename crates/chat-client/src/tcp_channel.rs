// crates/chat-client/src/tcp_channel.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use chat_protocol::{decode_server_frame, encode_client_frame, split_frame, ClientFrame, ProtocolError, ServerFrame};
use dashmap::DashMap;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::channel::{ChannelState, Completion, HubChannel, PushEvent, SubscriberRegistry, Subscription};
use crate::config::{ClientConfig, ReconnectPolicy};
use crate::error::{ConnectionError, InvocationError};

/// How long `disconnect()` waits for the connection task to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Heartbeat periods without any inbound frame before the hub counts as gone.
const MISSED_HEARTBEATS: u32 = 2;

/// [`HubChannel`] over one persistent TCP connection.
///
/// A background task owns the socket. It routes completions to waiting
/// invocations and pushes to subscriptions, writes outbound frames,
/// sends heartbeats, and reconnects with backoff when the transport
/// drops or the hub goes quiet (if the policy allows).
pub struct TcpHubChannel {
    settings: LinkSettings,
    shared: Arc<Shared>,
    outbound: Option<mpsc::UnboundedSender<ClientFrame>>,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone)]
struct LinkSettings {
    addr: String,
    connect_timeout: Duration,
    heartbeat: Duration,
    reconnect: ReconnectPolicy,
}

struct PendingInvocation {
    method: String,
    done: oneshot::Sender<Result<Completion, InvocationError>>,
}

/// State shared between the handle and the connection task.
struct Shared {
    subscribers: Arc<SubscriberRegistry>,
    pending: DashMap<u64, PendingInvocation>,
    next_invocation_id: AtomicU64,
    inbound_seq: AtomicU64,
    state: watch::Sender<ChannelState>,
}

enum LinkExit {
    /// The handle dropped its sender: `disconnect()` was called.
    Shutdown,
    Lost(String),
}

enum Redial {
    Connected(TcpStream),
    GaveUp,
    Shutdown,
}

impl TcpHubChannel {
    pub fn new(config: &ClientConfig) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);

        Self {
            settings: LinkSettings {
                addr: config.hub_addr.clone(),
                connect_timeout: config.connect_timeout(),
                heartbeat: config.heartbeat_interval(),
                reconnect: config.reconnect.clone(),
            },
            shared: Arc::new(Shared {
                subscribers: SubscriberRegistry::new(),
                pending: DashMap::new(),
                next_invocation_id: AtomicU64::new(1),
                inbound_seq: AtomicU64::new(0),
                state,
            }),
            outbound: None,
            task: None,
        }
    }

    pub fn addr(&self) -> &str {
        &self.settings.addr
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    fn sender(&self) -> Result<&mpsc::UnboundedSender<ClientFrame>, InvocationError> {
        if !matches!(self.state(), ChannelState::Connected { .. }) {
            return Err(InvocationError::NotConnected);
        }
        self.outbound.as_ref().ok_or(InvocationError::NotConnected)
    }
}

impl HubChannel for TcpHubChannel {
    async fn connect(&mut self) -> Result<(), ConnectionError> {
        if self.task.is_some() {
            return Err(ConnectionError::AlreadyConnected);
        }
        if self.state() == ChannelState::Closed {
            return Err(ConnectionError::Closed);
        }

        let stream = open_stream(&self.settings).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        self.shared.set_state(ChannelState::Connected { generation: 0 });
        self.task = Some(tokio::spawn(connection_task(
            stream,
            self.settings.clone(),
            Arc::clone(&self.shared),
            rx,
        )));

        info!(addr = %self.settings.addr, "Connected to hub");
        Ok(())
    }

    fn subscribe_many(&self, events: &[&str]) -> Subscription {
        self.shared.subscribers.subscribe_many(events)
    }

    async fn invoke(&self, method: &str, args: Value) -> Result<Completion, InvocationError> {
        let tx = self.sender()?;

        let id = self.shared.next_invocation_id.fetch_add(1, Ordering::Relaxed);
        let (done_tx, done_rx) = oneshot::channel();
        self.shared.pending.insert(
            id,
            PendingInvocation {
                method: method.to_string(),
                done: done_tx,
            },
        );
        // Forget the slot if the caller stops waiting.
        let _slot = PendingSlot {
            shared: &self.shared,
            id,
        };

        let frame = ClientFrame::Invoke {
            id,
            method: method.to_string(),
            args,
        };
        if tx.send(frame).is_err() {
            return Err(InvocationError::ConnectionLost);
        }

        debug!(id, %method, "invoked");
        match done_rx.await {
            Ok(result) => result,
            Err(_) => Err(InvocationError::ConnectionLost),
        }
    }

    async fn notify(&self, method: &str, args: Value) -> Result<(), InvocationError> {
        let tx = self.sender()?;

        let frame = ClientFrame::Send {
            method: method.to_string(),
            args,
        };
        tx.send(frame).map_err(|_| InvocationError::ConnectionLost)?;

        debug!(%method, "sent");
        Ok(())
    }

    async fn disconnect(&mut self) {
        // Dropping the sender ends the connection task's loop.
        self.outbound = None;

        if let Some(mut task) = self.task.take() {
            match timeout(SHUTDOWN_GRACE, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Connection task failed"),
                Err(_) => {
                    warn!("Connection task did not stop in time; aborting");
                    task.abort();
                }
            }
            info!(addr = %self.settings.addr, "Disconnected from hub");
        }

        self.shared.close();
    }

    fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }
}

struct PendingSlot<'a> {
    shared: &'a Shared,
    id: u64,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.shared.pending.remove(&self.id);
    }
}

impl Drop for TcpHubChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

impl Shared {
    fn set_state(&self, next: ChannelState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Route one inbound frame.
    fn route(&self, frame: ServerFrame) {
        let seq = self.inbound_seq.fetch_add(1, Ordering::SeqCst) + 1;

        match frame {
            ServerFrame::Completion { id, result, error } => {
                let Some((_, pending)) = self.pending.remove(&id) else {
                    warn!(id, seq, "completion for unknown invocation");
                    return;
                };

                let outcome = match error {
                    Some(message) => Err(InvocationError::Remote {
                        method: pending.method,
                        message,
                    }),
                    None => Ok(Completion {
                        seq,
                        value: result.unwrap_or(Value::Null),
                    }),
                };
                // The caller may have given up waiting.
                let _ = pending.done.send(outcome);
            }
            ServerFrame::Push { event, payload } => {
                let delivered = self.subscribers.dispatch(PushEvent { seq, event, payload });
                trace!(seq, delivered, "push");
            }
            ServerFrame::Pong => trace!(seq, "pong"),
        }
    }

    /// Fail every invocation still waiting for a response.
    fn fail_pending(&self, error: InvocationError) {
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                let _ = pending.done.send(Err(error.clone()));
            }
        }
    }

    /// Terminal cleanup: nothing is delivered after this.
    fn close(&self) {
        self.set_state(ChannelState::Closed);
        self.fail_pending(InvocationError::ConnectionLost);
        self.subscribers.clear();
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

async fn open_stream(settings: &LinkSettings) -> Result<TcpStream, ConnectionError> {
    debug!(addr = %settings.addr, "Connecting...");

    match timeout(settings.connect_timeout, TcpStream::connect(&settings.addr)).await {
        Ok(Ok(stream)) => {
            stream.set_nodelay(true).map_err(|source| ConnectionError::Io {
                addr: settings.addr.clone(),
                source,
            })?;
            Ok(stream)
        }
        Ok(Err(source)) => {
            error!(addr = %settings.addr, error = %source, "Connection failed");
            Err(ConnectionError::Io {
                addr: settings.addr.clone(),
                source,
            })
        }
        Err(_) => {
            error!(addr = %settings.addr, "Connection timed out");
            Err(ConnectionError::Timeout {
                addr: settings.addr.clone(),
                timeout_ms: settings.connect_timeout.as_millis() as u64,
            })
        }
    }
}

async fn connection_task(
    mut stream: TcpStream,
    settings: LinkSettings,
    shared: Arc<Shared>,
    mut out_rx: mpsc::UnboundedReceiver<ClientFrame>,
) {
    let mut generation = 0;

    loop {
        let reason = match drive_connection(&mut stream, &settings, &shared, &mut out_rx).await {
            LinkExit::Shutdown => return,
            LinkExit::Lost(reason) => reason,
        };

        if !settings.reconnect.enabled {
            warn!(%reason, "Connection lost; reconnect disabled");
            shared.close();
            return;
        }

        warn!(%reason, "Connection lost, attempting to reconnect...");
        match redial(&settings, &shared, &mut out_rx).await {
            Redial::Connected(new_stream) => {
                stream = new_stream;
                discard_in_flight(&shared, &mut out_rx);
                generation += 1;
                shared.set_state(ChannelState::Connected { generation });
                info!(generation, "Reconnected successfully");
            }
            Redial::GaveUp => {
                error!(
                    attempts = settings.reconnect.max_attempts,
                    "Giving up on reconnecting"
                );
                shared.close();
                return;
            }
            Redial::Shutdown => return,
        }
    }
}

/// Pump one established connection until it drops or is shut down.
async fn drive_connection(
    stream: &mut TcpStream,
    settings: &LinkSettings,
    shared: &Shared,
    out_rx: &mut mpsc::UnboundedReceiver<ClientFrame>,
) -> LinkExit {
    let (mut reader, mut writer) = stream.split();
    let mut read_buffer = BytesMut::with_capacity(64 * 1024);
    let mut write_buffer = BytesMut::with_capacity(64 * 1024);
    let mut heartbeat = interval_at(Instant::now() + settings.heartbeat, settings.heartbeat);
    let silence_limit = settings.heartbeat * MISSED_HEARTBEATS;
    let mut last_inbound = Instant::now();

    loop {
        if let Err(e) = route_buffered(&mut read_buffer, shared) {
            return LinkExit::Lost(e.to_string());
        }

        tokio::select! {
            _ = heartbeat.tick() => {
                if last_inbound.elapsed() >= silence_limit {
                    return LinkExit::Lost("hub stopped answering heartbeats".to_string());
                }
                if let Err(e) = write_frame(&mut writer, &mut write_buffer, &ClientFrame::Ping).await {
                    return LinkExit::Lost(format!("heartbeat failed: {}", e));
                }
            }

            frame = out_rx.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write_frame(&mut writer, &mut write_buffer, &frame).await {
                        return LinkExit::Lost(format!("write failed: {}", e));
                    }
                }
                None => return LinkExit::Shutdown,
            },

            read = reader.read_buf(&mut read_buffer) => match read {
                Ok(0) => return LinkExit::Lost("hub closed the connection".to_string()),
                Ok(_) => last_inbound = Instant::now(),
                Err(e) => return LinkExit::Lost(format!("read failed: {}", e)),
            },
        }
    }
}

/// Route every complete frame already sitting in `buffer`.
fn route_buffered(buffer: &mut BytesMut, shared: &Shared) -> Result<(), ProtocolError> {
    while let Some(body) = split_frame(buffer)? {
        let frame = decode_server_frame(&body)?;
        shared.route(frame);
    }
    Ok(())
}

async fn write_frame<W>(writer: &mut W, buffer: &mut BytesMut, frame: &ClientFrame) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    buffer.clear();
    encode_client_frame(frame, buffer)?;

    writer.write_all(buffer).await?;
    writer.flush().await?;
    trace!(?frame, "Sent frame");
    Ok(())
}

/// Retry the transport with exponential backoff.
async fn redial(
    settings: &LinkSettings,
    shared: &Shared,
    out_rx: &mut mpsc::UnboundedReceiver<ClientFrame>,
) -> Redial {
    for attempt in 1..=settings.reconnect.max_attempts {
        shared.set_state(ChannelState::Reconnecting { attempt });
        discard_in_flight(shared, out_rx);

        let delay = settings.reconnect.delay_for(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting before reconnect");

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                frame = out_rx.recv() => match frame {
                    // Raced with the state change; its invocation is failed below.
                    Some(_) => continue,
                    None => return Redial::Shutdown,
                },
            }
        }

        match open_stream(settings).await {
            Ok(stream) => return Redial::Connected(stream),
            Err(e) => warn!(attempt, error = %e, "Reconnection failed"),
        }
    }

    Redial::GaveUp
}

/// Drop frames queued for a dead transport and fail their invocations.
fn discard_in_flight(shared: &Shared, out_rx: &mut mpsc::UnboundedReceiver<ClientFrame>) {
    while let Ok(frame) = out_rx.try_recv() {
        debug!(?frame, "Dropping frame queued while disconnected");
    }
    shared.fail_pending(InvocationError::ConnectionLost);
}
