//! chat-hub
//!
//! Multi-client async TCP hub holding the room's authoritative
//! participant list and message history.

pub mod config;
pub mod types;
pub mod state;
pub mod server;

// these are internal modules, not re-exported
mod client;
mod hub_task;
