//! chat-client
//!
//! Client side of the chat room:
//! - [`channel`]     : the hub channel contract (`HubChannel`) and subscriptions
//! - [`tcp_channel`] : `HubChannel` over a persistent TCP connection
//! - [`session`]     : join handshake, live updates and the two projections
//! - [`config`]      : client configuration
//! - [`error`]       : connection / invocation / session errors

pub mod channel;
pub mod config;
pub mod error;
pub mod session;
pub mod tcp_channel;

pub use channel::{ChannelState, Completion, HubChannel, PushEvent, SubscriberRegistry, Subscription};
pub use config::{ClientConfig, ConfigError, ReconnectPolicy};
pub use error::{ConnectionError, InvocationError, SessionError};
pub use session::{Session, SessionEvent, SessionState};
pub use tcp_channel::TcpHubChannel;
