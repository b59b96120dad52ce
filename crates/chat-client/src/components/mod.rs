// crates/chat-client/src/components/mod.rs

pub mod compose;
pub mod help;
pub mod login;
pub mod message_feed;
pub mod presence_list;
pub mod status_bar;
