//! Logical frames exchanged over a hub connection.
//!
//! Both directions use a JSON object tagged by `type`:
//!
//! ```text
//! {"type":"invoke","id":7,"method":"fetchPresenceList","args":null}
//! {"type":"send","method":"announcePresence","args":"alice"}
//! {"type":"completion","id":7,"result":["alice","bob"]}
//! {"type":"completion","id":8,"error":"unknown hub method: nope"}
//! {"type":"push","event":"participant-joined","payload":"carol"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Request that expects exactly one `Completion` with the same `id`.
    Invoke {
        id: u64,
        method: String,
        #[serde(default)]
        args: Value,
    },

    /// One-way request; the hub never answers it.
    Send {
        method: String,
        #[serde(default)]
        args: Value,
    },

    /// Keep-alive.
    Ping,
}

/// Hub → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Outcome of an `Invoke`. Exactly one of `result` / `error` is set.
    Completion {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Server-initiated event.
    Push {
        event: String,
        #[serde(default)]
        payload: Value,
    },

    /// Answer to `Ping`.
    Pong,
}

impl ServerFrame {
    pub fn success(id: u64, result: Value) -> Self {
        ServerFrame::Completion {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: impl Into<String>) -> Self {
        ServerFrame::Completion {
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn push(event: impl Into<String>, payload: Value) -> Self {
        ServerFrame::Push {
            event: event.into(),
            payload,
        }
    }
}
