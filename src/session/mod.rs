//! Agent session: one connection set plus one conversation.

pub mod conversation;
pub mod orchestrator;

pub use conversation::Conversation;
pub use orchestrator::{ConnectionSet, ConnectionSetState, Orchestrator, ToolCatalog};

use std::sync::Arc;

use strum::Display;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{ChatError, Result};
use crate::model::ChatModel;
use crate::types::Turn;

/// Connection lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Error,
}

/// What the chat executor is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExecutorState {
    Idle,
    Connecting,
    InFlight,
    /// The last submission failed. Cleared by the next one.
    Failed,
}

/// Coordinates a session's MCP connections and conversation history.
///
/// The connection set is present only while the session is
/// [`SessionState::Ready`]. Clearing history never touches connections;
/// disconnecting always clears history.
pub struct Session {
    id: Uuid,
    configs: Vec<ServerConfig>,
    orchestrator: Orchestrator,
    model: Arc<dyn ChatModel>,
    state: SessionState,
    executor: ExecutorState,
    connection_set: Option<ConnectionSet>,
    conversation: Conversation,
    last_error: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("configs", &self.configs)
            .field("state", &self.state)
            .field("executor", &self.executor)
            .field("connection_set", &self.connection_set)
            .field("turns", &self.conversation.len())
            .finish()
    }
}

impl Session {
    pub fn new(
        configs: Vec<ServerConfig>,
        orchestrator: Orchestrator,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            configs,
            orchestrator,
            model,
            state: SessionState::Uninitialized,
            executor: ExecutorState::Idle,
            connection_set: None,
            conversation: Conversation::new(),
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn executor_state(&self) -> ExecutorState {
        self.executor
    }

    pub fn configs(&self) -> &[ServerConfig] {
        &self.configs
    }

    pub fn connection_set(&self) -> Option<&ConnectionSet> {
        self.connection_set.as_ref()
    }

    /// Full history, tool bookkeeping included.
    pub fn history(&self) -> &[Turn] {
        self.conversation.turns()
    }

    pub fn transcript(&self) -> Vec<Turn> {
        self.conversation.transcript()
    }

    /// Message of the most recent connect or chat failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Open the connection set. Does nothing when already ready.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == SessionState::Ready && self.connection_set.is_some() {
            return Ok(());
        }

        self.state = SessionState::Initializing;
        self.executor = ExecutorState::Connecting;
        tracing::info!(session_id = %self.id, servers = self.configs.len(), "connecting session");

        match self.orchestrator.open(&self.configs).await {
            Ok(set) => {
                self.connection_set = Some(set);
                self.state = SessionState::Ready;
                self.executor = ExecutorState::Idle;
                self.last_error = None;
                tracing::info!(session_id = %self.id, "session ready");
                Ok(())
            }
            Err(error) => {
                self.state = SessionState::Error;
                self.executor = ExecutorState::Failed;
                self.last_error = Some(error.to_string());
                tracing::warn!(session_id = %self.id, %error, "session connect failed");
                Err(error)
            }
        }
    }

    /// Send one user message and return the model's reply.
    ///
    /// Connects first if needed. On failure the user turn and an
    /// `"Error during chat: ..."` assistant turn are recorded and the error
    /// is returned as well. Blank input is rejected before anything runs.
    pub async fn send_message(&mut self, text: &str) -> Result<String> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        match self.execute(message).await {
            Ok(reply) => {
                self.executor = ExecutorState::Idle;
                Ok(reply)
            }
            Err(error) => {
                self.record_failure(message, &error);
                Err(error)
            }
        }
    }

    /// Record a failed turn for `text`: the user turn, an
    /// `"Error during chat: ..."` assistant turn, and a failed executor.
    ///
    /// Used directly when a turn was cut short before
    /// [`Session::send_message`] could record it.
    pub fn record_failure(&mut self, text: &str, error: &ChatError) {
        tracing::warn!(session_id = %self.id, %error, "chat turn failed");
        self.conversation.push(Turn::user(text.trim()));
        self.conversation
            .push(Turn::assistant(format!("Error during chat: {error}")));
        self.executor = ExecutorState::Failed;
        self.last_error = Some(error.to_string());
    }

    /// Forget the connection set without closing it; history is kept.
    ///
    /// The next message reconnects. Used when the runtime that owned the
    /// connections' background tasks is gone.
    pub fn abandon_connections(&mut self) {
        if let Some(set) = self.connection_set.take() {
            set.abandon();
        }
        self.state = SessionState::Uninitialized;
        if self.executor != ExecutorState::Failed {
            self.executor = ExecutorState::Idle;
        }
    }

    async fn execute(&mut self, message: &str) -> Result<String> {
        if self.connection_set.is_none() {
            self.connect().await?;
        }

        self.executor = ExecutorState::InFlight;
        let set = self
            .connection_set
            .as_ref()
            .ok_or_else(|| ChatError::InvalidState("session has no connection set".into()))?;
        let reply = self
            .model
            .invoke(message, self.conversation.snapshot(), set)
            .await?;

        self.conversation.replace(reply.history);
        Ok(reply.reply)
    }

    /// Clear the conversation. Connections stay open.
    pub fn reset(&mut self) {
        self.conversation.reset();
    }

    /// Close the connection set and clear history. Close failures are
    /// logged, never returned. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if self.connection_set.is_some() {
            tracing::info!(session_id = %self.id, "disconnecting session");
        }
        Orchestrator::close(self.connection_set.take()).await;
        self.conversation.reset();
        self.state = SessionState::Uninitialized;
        self.executor = ExecutorState::Idle;
        self.last_error = None;
    }
}
