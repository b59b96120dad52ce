//! chat-protocol
//!
//! Wire-level contract between chat clients and the hub.
//!
//! - [`wire_types`] : method / event names and framing constants
//! - [`frames`]     : JSON envelopes exchanged in each frame
//! - [`codec`]      : length-prefixed framing and encode/decode

pub mod wire_types;
pub mod frames;
pub mod codec;

pub use wire_types::{HubEvent, HubMethod, MAX_FRAME_LEN, PROTOCOL_VERSION};
pub use frames::{ClientFrame, ServerFrame};
pub use codec::{
    ProtocolError,
    decode_client_frame,
    decode_server_frame,
    encode_client_frame,
    encode_server_frame,
    split_frame,
};
