//! Shared test helpers: a scripted MCP connector and a mock chat model.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use mcp_chat::config::{ServerConfig, Transport};
use mcp_chat::error::{ChatError, Result};
use mcp_chat::mcp::{Connector, McpToolSchema, ToolCallOutput, ToolConnection};
use mcp_chat::model::{ChatModel, ModelReply};
use mcp_chat::session::ConnectionSet;
use mcp_chat::types::{ToolCall, Turn};

/// Ordered record of open/close/call events across all mock handles.
#[derive(Default)]
pub struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// A connection whose tools are `search` plus one named after the server.
pub struct MockHandle {
    name: String,
    tools: Vec<String>,
    fail_calls: bool,
    closed: bool,
    log: Arc<EventLog>,
    worker: Option<mpsc::UnboundedSender<oneshot::Sender<()>>>,
}

impl MockHandle {
    pub fn new(name: &str, log: Arc<EventLog>) -> Self {
        Self {
            name: name.to_string(),
            tools: vec!["search".to_string(), format!("{name}_info")],
            fail_calls: false,
            closed: false,
            log,
            worker: None,
        }
    }

    pub fn failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    /// Serve requests through a task spawned on the current runtime, the
    /// way a real MCP client runs its protocol loop.
    pub fn with_worker(mut self) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<oneshot::Sender<()>>();
        tokio::spawn(async move {
            while let Some(reply) = rx.recv().await {
                let _ = reply.send(());
            }
        });
        self.worker = Some(tx);
        self
    }

    async fn ping_worker(&self) -> Result<()> {
        let Some(worker) = &self.worker else {
            return Ok(());
        };
        let closed = || ChatError::InvalidState(format!("MCP session '{}' is closed", self.name));
        let (tx, rx) = oneshot::channel();
        worker.send(tx).map_err(|_| closed())?;
        rx.await.map_err(|_| closed())
    }
}

#[async_trait]
impl ToolConnection for MockHandle {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<McpToolSchema>> {
        self.ping_worker().await?;
        Ok(self
            .tools
            .iter()
            .map(|tool| {
                McpToolSchema::new(
                    tool.as_str(),
                    format!("{tool} on {}", self.name),
                    json!({"type": "object", "properties": {"query": {"type": "string"}}}),
                )
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolCallOutput> {
        self.log.push(format!("call {}:{name}", self.name));
        self.ping_worker().await?;
        if self.fail_calls {
            return Err(ChatError::ToolExecution {
                tool_name: name.to_string(),
                message: "backend unavailable".into(),
            });
        }
        Ok(ToolCallOutput::text(format!("{}:{name}:{arguments}", self.name)))
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.log.push(format!("close {}", self.name));
        Ok(())
    }
}

/// Connector that opens [`MockHandle`]s and fails on chosen server names.
pub struct MockConnector {
    pub log: Arc<EventLog>,
    fail_on: Vec<String>,
    workers: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            log: Arc::new(EventLog::default()),
            fail_on: Vec::new(),
            workers: false,
        }
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on.push(name.to_string());
        self
    }

    /// Give every opened handle a background worker task.
    pub fn with_workers(mut self) -> Self {
        self.workers = true;
        self
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, config: &ServerConfig) -> Result<Box<dyn ToolConnection>> {
        self.log.push(format!("open {}", config.name));
        if self.fail_on.contains(&config.name) {
            return Err(ChatError::connect(
                &config.name,
                &config.url,
                "connection refused",
            ));
        }
        let handle = MockHandle::new(&config.name, self.log.clone());
        let handle = if self.workers {
            handle.with_worker()
        } else {
            handle
        };
        Ok(Box::new(handle))
    }
}

/// Chat model that echoes, fails or panics on demand, or calls a tool first.
///
/// A message `use <tool>` calls that tool through the connection set
/// before replying.
#[derive(Default)]
pub struct MockModel {
    calls: AtomicUsize,
    fail_on: Option<String>,
    panic_on: Option<String>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(message: &str) -> Self {
        Self {
            fail_on: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn panicking_on(message: &str) -> Self {
        Self {
            panic_on: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn invoke(
        &self,
        message: &str,
        mut history: Vec<Turn>,
        tools: &ConnectionSet,
    ) -> Result<ModelReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(message) {
            return Err(ChatError::Model("model exploded".into()));
        }
        if self.panic_on.as_deref() == Some(message) {
            panic!("model bug");
        }

        history.push(Turn::user(message));
        let reply = match message.strip_prefix("use ") {
            Some(tool) => {
                let catalog = tools.catalog().await?;
                let call = ToolCall {
                    id: format!("call_{}", history.len()),
                    name: tool.to_string(),
                    arguments: json!({"query": "rust"}),
                };
                let output = tools
                    .call_tool(&catalog, &call.name, call.arguments.clone())
                    .await?
                    .into_model_text();
                history.push(Turn::assistant_tool_calls("", vec![call.clone()]));
                history.push(Turn::tool_result(call.id, output.clone()));
                format!("tool said {output}")
            }
            None => format!("echo: {message}"),
        };
        history.push(Turn::assistant(reply.clone()));
        Ok(ModelReply { reply, history })
    }
}

pub fn server(name: &str) -> ServerConfig {
    ServerConfig::new(format!("http://{name}.test/mcp"), name, Transport::StreamableHttp)
}
