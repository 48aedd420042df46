//! Core types for mcp-chat.

pub mod message;

pub use message::*;
