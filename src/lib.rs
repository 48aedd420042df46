//! mcp-chat: an agent session manager for MCP tool servers.
//!
//! A [`session::Session`] turns a list of server configs into one set of
//! live MCP connections, keeps a conversation with a language model that
//! can call the servers' tools, and tears everything down on disconnect.
//! [`app::ChatApp`] wraps a session behind synchronous calls for
//! front-ends that are not async.
//!
//! # Quick Start
//!
//! ```no_run
//! use mcp_chat::prelude::*;
//!
//! let config = AppConfig::from_env();
//! let mut app = ChatApp::openai(&config, ModelSettings::default());
//! let credentials = ApiCredentials::new("sk-...");
//! let servers = [RawServerEntry::new("http://localhost:8000/mcp")];
//! println!("{:?}", app.initialize(&credentials, &servers));
//! println!("{:?}", app.send_message("What tools do you have?"));
//! app.shutdown();
//! ```

pub mod app;
pub mod bridge;
pub mod config;
pub mod error;
pub mod mcp;
pub mod model;
pub mod prelude;
pub mod session;
pub mod slots;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
