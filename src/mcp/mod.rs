//! Model Context Protocol (MCP) connections.

pub mod connection;
pub mod schema;

#[cfg(feature = "mcp")]
pub mod client;
#[cfg(feature = "mcp")]
pub mod sse;
#[cfg(feature = "mcp")]
pub mod transport;

pub use connection::{Connector, ToolConnection};
pub use schema::{McpToolSchema, ToolCallOutput};

#[cfg(feature = "mcp")]
pub use client::RmcpConnection;
#[cfg(feature = "mcp")]
pub use transport::RmcpConnector;
