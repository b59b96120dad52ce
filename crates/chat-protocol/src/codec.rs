//! Framing and encoding for hub connections.
//!
//! Stream layout:
//!
//! ```text
//! [0..4] : body length (u32 BE, 1..=MAX_FRAME_LEN)
//! [4]    : version (PROTOCOL_VERSION)
//! [5..]  : JSON-encoded `ClientFrame` / `ServerFrame`
//! ```
//!
//! `encode_*` append a complete frame (prefix included) to a buffer.
//! `decode_*` take one body (prefix already stripped, as returned by
//! [`split_frame`]).

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::frames::{ClientFrame, ServerFrame};
use crate::wire_types::{validate_frame_len, LENGTH_PREFIX_LEN, MAX_FRAME_LEN, PROTOCOL_VERSION};

/// Errors that can arise when framing or decoding.
#[derive(Debug)]
pub enum ProtocolError {
    /// Buffer too short for the expected fields.
    Truncated,
    /// Declared or encoded body exceeds `MAX_FRAME_LEN`.
    FrameTooLarge(usize),
    /// Zero-length body.
    EmptyFrame,
    /// Unsupported or mismatched protocol version.
    VersionMismatch(u8),
    /// Body is not a valid envelope.
    Json(serde_json::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated => write!(f, "Buffer truncated"),
            ProtocolError::FrameTooLarge(len) => {
                write!(f, "Frame too large: {} bytes (max {})", len, MAX_FRAME_LEN)
            }
            ProtocolError::EmptyFrame => write!(f, "Empty frame"),
            ProtocolError::VersionMismatch(v) => {
                write!(f, "Protocol version mismatch: got {}, expected {}", v, PROTOCOL_VERSION)
            }
            ProtocolError::Json(e) => write!(f, "Malformed frame body: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Json(e)
    }
}

// ============================================================================
// Framing
// ============================================================================

/// Pull one complete frame body out of `buf`, if one is buffered.
///
/// Returns `Ok(None)` when more bytes are needed. On success the
/// prefix and body are consumed from `buf`; leftover bytes (the start
/// of the next frame) stay in place.
pub fn split_frame(buf: &mut BytesMut) -> Result<Option<BytesMut>, ProtocolError> {
    if buf.len() < LENGTH_PREFIX_LEN {
        return Ok(None);
    }

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len == 0 {
        return Err(ProtocolError::EmptyFrame);
    }
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    if buf.len() < LENGTH_PREFIX_LEN + len {
        // Reserve what the rest of this frame needs up front.
        buf.reserve(LENGTH_PREFIX_LEN + len - buf.len());
        return Ok(None);
    }

    buf.advance(LENGTH_PREFIX_LEN);
    Ok(Some(buf.split_to(len)))
}

// ============================================================================
// Client → hub
// ============================================================================

pub fn encode_client_frame(frame: &ClientFrame, out: &mut BytesMut) -> Result<(), ProtocolError> {
    encode_body(frame, out)
}

pub fn decode_client_frame(body: &[u8]) -> Result<ClientFrame, ProtocolError> {
    decode_body(body)
}

// ============================================================================
// Hub → client
// ============================================================================

pub fn encode_server_frame(frame: &ServerFrame, out: &mut BytesMut) -> Result<(), ProtocolError> {
    encode_body(frame, out)
}

pub fn decode_server_frame(body: &[u8]) -> Result<ServerFrame, ProtocolError> {
    decode_body(body)
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn encode_body<T: Serialize>(frame: &T, out: &mut BytesMut) -> Result<(), ProtocolError> {
    let json = serde_json::to_vec(frame)?;
    let body_len = 1 + json.len();
    if !validate_frame_len(body_len) {
        return Err(ProtocolError::FrameTooLarge(body_len));
    }

    out.reserve(LENGTH_PREFIX_LEN + body_len);
    out.put_u32(body_len as u32);
    out.put_u8(PROTOCOL_VERSION);
    out.extend_from_slice(&json);
    Ok(())
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    let (&version, json) = body.split_first().ok_or(ProtocolError::Truncated)?;
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch(version));
    }
    if json.is_empty() {
        return Err(ProtocolError::Truncated);
    }
    Ok(serde_json::from_slice(json)?)
}
