//! Opens and closes a session's MCP connections as one unit.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::{ChatError, Result};
use crate::mcp::{Connector, McpToolSchema, ToolCallOutput, ToolConnection};

/// Lifecycle of a [`ConnectionSet`]. `Open -> Closed` is the only transition
/// after construction; a closed set is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSetState {
    Unopened,
    Open,
    Closed,
}

/// The live connections bound to one session, one per config, in
/// declaration order.
pub struct ConnectionSet {
    handles: Vec<Box<dyn ToolConnection>>,
    state: ConnectionSetState,
}

impl std::fmt::Debug for ConnectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSet")
            .field("servers", &self.server_names())
            .field("state", &self.state)
            .finish()
    }
}

impl ConnectionSet {
    fn unopened(capacity: usize) -> Self {
        Self {
            handles: Vec::with_capacity(capacity),
            state: ConnectionSetState::Unopened,
        }
    }

    /// Build an open set from handles that are already connected.
    pub fn from_handles(handles: Vec<Box<dyn ToolConnection>>) -> Self {
        Self {
            handles,
            state: ConnectionSetState::Open,
        }
    }

    pub fn state(&self) -> ConnectionSetState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionSetState::Open
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.handles.iter().map(|h| h.server_name()).collect()
    }

    /// Collect every server's tools into one routed catalog.
    ///
    /// When two servers expose the same tool name the earlier server wins.
    pub async fn catalog(&self) -> Result<ToolCatalog> {
        self.ensure_open()?;
        let mut catalog = ToolCatalog::default();
        for (index, handle) in self.handles.iter().enumerate() {
            for tool in handle.list_tools().await? {
                if let Some(&owner) = catalog.routes.get(&tool.name) {
                    tracing::warn!(
                        tool = %tool.name,
                        kept = %self.handles[owner].server_name(),
                        skipped = %handle.server_name(),
                        "duplicate MCP tool name"
                    );
                    continue;
                }
                catalog.routes.insert(tool.name.clone(), index);
                catalog.tools.push(tool);
            }
        }
        Ok(catalog)
    }

    pub async fn list_tools(&self) -> Result<Vec<McpToolSchema>> {
        Ok(self.catalog().await?.tools)
    }

    /// Call a tool on the server that owns it in `catalog`.
    pub async fn call_tool(
        &self,
        catalog: &ToolCatalog,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallOutput> {
        self.ensure_open()?;
        let index = catalog
            .route(name)
            .ok_or_else(|| ChatError::ToolNotFound(name.to_string()))?;
        let handle = self
            .handles
            .get(index)
            .ok_or_else(|| ChatError::ToolNotFound(name.to_string()))?;
        tracing::debug!(tool = name, server = %handle.server_name(), "routing MCP tool call");
        handle.call_tool(name, arguments).await
    }

    /// Close every handle. Individual failures are logged and skipped;
    /// closing a closed set does nothing.
    pub async fn close(&mut self) {
        if self.state == ConnectionSetState::Closed {
            return;
        }
        self.state = ConnectionSetState::Closed;
        for handle in &mut self.handles {
            if let Err(error) = handle.close().await {
                tracing::warn!(server = %handle.server_name(), %error, "error closing MCP connection");
            }
        }
    }

    /// Drop every handle without closing it.
    ///
    /// For handles whose background tasks are already gone, e.g. after the
    /// runtime that spawned them was torn down.
    pub fn abandon(mut self) {
        if self.state == ConnectionSetState::Open {
            tracing::warn!(servers = self.handles.len(), "abandoning MCP connections");
        }
        self.state = ConnectionSetState::Closed;
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            ConnectionSetState::Open => Ok(()),
            other => Err(ChatError::InvalidState(format!(
                "connection set is {other:?}"
            ))),
        }
    }
}

impl Drop for ConnectionSet {
    fn drop(&mut self) {
        if self.state == ConnectionSetState::Open && !self.handles.is_empty() {
            tracing::warn!(
                servers = self.handles.len(),
                "connection set dropped without close"
            );
        }
    }
}

/// Tools offered by a connection set and the server each one routes to.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    pub tools: Vec<McpToolSchema>,
    routes: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn route(&self, name: &str) -> Option<usize> {
        self.routes.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Turns server configs into connection sets through a [`Connector`].
#[derive(Clone)]
pub struct Orchestrator {
    connector: Arc<dyn Connector>,
}

impl Orchestrator {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Open one handle per config, in order.
    ///
    /// On the first failure every handle opened so far is closed before the
    /// error is returned.
    pub async fn open(&self, configs: &[ServerConfig]) -> Result<ConnectionSet> {
        let mut set = ConnectionSet::unopened(configs.len());

        for config in configs {
            match self.connector.open(config).await {
                Ok(handle) => set.handles.push(handle),
                Err(error) => {
                    let error = match error {
                        connect @ ChatError::Connect { .. } => connect,
                        other => ChatError::connect(&config.name, &config.url, other),
                    };
                    tracing::warn!(
                        server = %config.name,
                        url = %config.url,
                        opened = set.handles.len(),
                        "MCP connection failed, closing opened siblings"
                    );
                    set.close().await;
                    return Err(error);
                }
            }
        }

        set.state = ConnectionSetState::Open;
        tracing::debug!(servers = set.len(), "connection set open");
        Ok(set)
    }

    /// Close a set if there is one. Never fails.
    pub async fn close(set: Option<ConnectionSet>) {
        if let Some(mut set) = set {
            set.close().await;
        }
    }
}
