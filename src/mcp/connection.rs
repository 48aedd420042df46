//! Transport-agnostic seams for tool-provider connections.

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::error::Result;

use super::schema::{McpToolSchema, ToolCallOutput};

/// One live connection to a tool-provider server.
#[async_trait]
pub trait ToolConnection: Send + Sync {
    /// Name of the server this connection was opened for.
    fn server_name(&self) -> &str;

    /// List the tools the server exposes.
    async fn list_tools(&self) -> Result<Vec<McpToolSchema>>;

    /// Execute a tool on the server.
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolCallOutput>;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Opens connections from validated server configs.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, config: &ServerConfig) -> Result<Box<dyn ToolConnection>>;
}
