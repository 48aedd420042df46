//! rmcp-backed connection to one MCP server.

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, JsonObject},
    service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceError},
};
use serde_json::Value;

use crate::error::{ChatError, Result};

use super::connection::ToolConnection;
use super::schema::{McpToolSchema, ToolCallOutput};

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type McpRunningService = RunningService<RoleClient, DynClientService>;

/// An initialized MCP session. `close` cancels the rmcp service task.
pub struct RmcpConnection {
    server_name: String,
    session: Option<McpRunningService>,
}

impl RmcpConnection {
    /// Wrap a running service whose initialize handshake already completed.
    pub fn new(server_name: impl Into<String>, session: McpRunningService) -> Self {
        Self {
            server_name: server_name.into(),
            session: Some(session),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.session.as_ref().map_or(true, |s| s.is_closed())
    }

    fn session(&self) -> Result<&McpRunningService> {
        match self.session.as_ref() {
            Some(session) if !session.is_closed() => Ok(session),
            _ => Err(ChatError::InvalidState(format!(
                "MCP session '{}' is closed",
                self.server_name
            ))),
        }
    }

    /// Attribute an rmcp failure to the tool being called, or to this
    /// server when no tool is involved.
    fn request_error(&self, request: Request<'_>, error: ServiceError) -> ChatError {
        let detail = match error {
            ServiceError::Timeout { timeout } => {
                return ChatError::Timeout(timeout.as_millis() as u64)
            }
            ServiceError::McpError(error) => {
                format!("MCP error {}: {}", error.code.0, error.message)
            }
            ServiceError::TransportSend(error) => format!("transport send failed: {error}"),
            ServiceError::TransportClosed => "transport closed".to_string(),
            ServiceError::UnexpectedResponse => "unexpected response".to_string(),
            ServiceError::Cancelled { reason: Some(reason) } => {
                format!("request cancelled ({reason})")
            }
            ServiceError::Cancelled { reason: None } => "request cancelled".to_string(),
            other => other.to_string(),
        };
        match request {
            Request::CallTool(tool) => ChatError::ToolExecution {
                tool_name: tool.to_string(),
                message: detail,
            },
            Request::ListTools => ChatError::Server {
                server: self.server_name.clone(),
                message: format!("listing tools failed: {detail}"),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Request<'a> {
    ListTools,
    CallTool(&'a str),
}


#[async_trait]
impl ToolConnection for RmcpConnection {
    fn server_name(&self) -> &str {
        &self.server_name
    }

    async fn list_tools(&self) -> Result<Vec<McpToolSchema>> {
        let session = self.session()?;

        // Servers without pagination support reject the cursor-walking form.
        let tools = match session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                session
                    .list_tools(None)
                    .await
                    .map_err(|e| self.request_error(Request::ListTools, e))?
                    .tools
            }
            Err(e) => return Err(self.request_error(Request::ListTools, e)),
        };
        tracing::debug!(server = %self.server_name, tools = tools.len(), "listed MCP tools");

        Ok(tools.into_iter().map(McpToolSchema::from).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallOutput> {
        let session = self.session()?;
        let arguments = wire_arguments(name, arguments)?;

        let result = session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.to_owned().into(),
                arguments,
                task: None,
            })
            .await
            .map_err(|e| self.request_error(Request::CallTool(name), e))?;

        ToolCallOutput::from_call_result(name, result)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        if session.is_closed() {
            tracing::debug!(server = %self.server_name, "MCP session already closed by peer");
            return Ok(());
        }
        session
            .cancel()
            .await
            .map(|reason| {
                tracing::debug!(server = %self.server_name, ?reason, "MCP session closed");
            })
            .map_err(|e| ChatError::Disconnect {
                server: self.server_name.clone(),
                message: e.to_string(),
            })
    }
}

/// Tool arguments go over the wire as a JSON object. A string holding an
/// object is unwrapped first; null or a blank string means no arguments.
fn wire_arguments(tool: &str, arguments: Value) -> Result<Option<JsonObject>> {
    let invalid = |detail: String| ChatError::ToolExecution {
        tool_name: tool.to_string(),
        message: format!("invalid arguments: {detail}"),
    };

    let value = match arguments {
        Value::String(raw) if raw.trim().is_empty() => return Ok(None),
        Value::String(raw) => {
            serde_json::from_str(raw.trim()).map_err(|e| invalid(e.to_string()))?
        }
        other => other,
    };
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(invalid(format!("expected a JSON object, got {other}"))),
    }
}

/// Describe an initialize handshake failure.
pub(crate) fn describe_initialize_error(error: ClientInitializeError) -> String {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            format!("connection closed during initialize: {context}")
        }
        ClientInitializeError::TransportError { error, context } => {
            format!("transport error during initialize ({context}): {error}")
        }
        ClientInitializeError::JsonRpcError(error) => format!(
            "initialize rejected with JSON-RPC error {}: {}",
            error.code.0, error.message
        ),
        ClientInitializeError::Cancelled => "initialize cancelled".into(),
        other => format!("initialize failed: {other}"),
    }
}
