//! Synchronous front-end boundary over one [`Session`].
//!
//! Every operation runs through the [`Bridge`] and reports outcomes as
//! display strings; no [`ChatError`](crate::error::ChatError) crosses this
//! boundary.

use std::sync::Arc;

use crate::bridge::Bridge;
use crate::config::{build_server_configs, ApiCredentials, RawServerEntry};
use crate::error::{ChatError, Result};
use crate::mcp::Connector;
use crate::model::ChatModel;
use crate::session::{Orchestrator, Session};
use crate::types::Turn;

/// Builds the model a new session talks to.
pub type ModelFactory =
    Arc<dyn Fn(&ApiCredentials) -> Result<Arc<dyn ChatModel>> + Send + Sync>;

pub const NOT_INITIALIZED_MESSAGE: &str =
    "Please initialize the agent first by providing your OpenAI API key.";
pub const DISCONNECTED_MESSAGE: &str = "Agent disconnected successfully!";
pub const RESET_MESSAGE: &str = "Agent conversation history reset successfully!";
pub const NO_AGENT_TO_RESET_MESSAGE: &str =
    "No agent to reset. Please initialize the agent first.";

pub struct ChatApp {
    bridge: Bridge,
    connector: Arc<dyn Connector>,
    model_factory: ModelFactory,
    session: Option<Session>,
}

impl ChatApp {
    pub fn new(connector: Arc<dyn Connector>, model_factory: ModelFactory) -> Self {
        Self {
            bridge: Bridge::new(),
            connector,
            model_factory,
            session: None,
        }
    }

    /// An app wired to real MCP servers and the OpenAI chat model.
    #[cfg(feature = "mcp")]
    pub fn openai(
        config: &crate::config::AppConfig,
        settings: crate::model::ModelSettings,
    ) -> Self {
        use crate::mcp::RmcpConnector;
        use crate::model::OpenAiChatModel;

        let connector = Arc::new(RmcpConnector::new(config.connect_timeout));
        let factory: ModelFactory = Arc::new(move |credentials: &ApiCredentials| {
            let model = OpenAiChatModel::new(credentials, settings.clone())?;
            Ok(Arc::new(model) as Arc<dyn ChatModel>)
        });
        Self::new(connector, factory)
    }

    /// The bridge this app drives its session through, for front-end I/O
    /// that should share the same runtime.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Visible turns of the current session, empty without one.
    pub fn transcript(&self) -> Vec<Turn> {
        self.session
            .as_ref()
            .map(Session::transcript)
            .unwrap_or_default()
    }

    /// Replace any existing session with a new one and connect it.
    ///
    /// On failure no session is kept.
    pub fn initialize(
        &mut self,
        credentials: &ApiCredentials,
        entries: &[RawServerEntry],
    ) -> std::result::Result<String, String> {
        if self.session.is_some() {
            self.disconnect()?;
        }

        let session = self.build_session(credentials, entries);
        let mut session = session.map_err(|e| format!("Error initializing agent: {e}"))?;

        match self.bridge.run(session.connect()) {
            Ok(Ok(())) => {
                let servers = session.configs().len();
                tracing::info!(session_id = %session.id(), servers, "agent initialized");
                self.session = Some(session);
                Ok(if servers == 0 {
                    "Agent initialized successfully (no MCP servers configured)!".to_string()
                } else {
                    format!("Agent initialized successfully with {servers} MCP server(s)!")
                })
            }
            Ok(Err(error)) => Err(format!("Error initializing agent: {error}")),
            Err(error) => {
                if matches!(error, ChatError::Internal(_)) {
                    session.abandon_connections();
                }
                Err(format!("Error initializing agent: {error}"))
            }
        }
    }

    fn build_session(
        &self,
        credentials: &ApiCredentials,
        entries: &[RawServerEntry],
    ) -> Result<Session> {
        let configs = build_server_configs(entries)?;
        let model = (self.model_factory)(credentials)?;
        Ok(Session::new(
            configs,
            Orchestrator::new(self.connector.clone()),
            model,
        ))
    }

    /// Send one message and return the updated transcript.
    pub fn send_message(&mut self, text: &str) -> std::result::Result<Vec<Turn>, String> {
        let Some(session) = self.session.as_mut() else {
            return Err(NOT_INITIALIZED_MESSAGE.to_string());
        };
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage.to_string());
        }

        match self.bridge.run(session.send_message(text)) {
            Ok(Ok(_reply)) => Ok(session.transcript()),
            Ok(Err(error)) => Err(format!("Error during chat: {error}")),
            Err(error @ ChatError::Internal(_)) => {
                // The turn was dropped mid-flight along with the runtime that
                // ran the connections' background tasks.
                session.record_failure(text, &error);
                session.abandon_connections();
                Err(format!("Error during chat: {error}"))
            }
            Err(error) => Err(format!("Error: {error}")),
        }
    }

    /// Clear the conversation; connections stay open.
    pub fn reset(&mut self) -> Vec<Turn> {
        match self.session.as_mut() {
            Some(session) => {
                session.reset();
                tracing::info!(session_id = %session.id(), "conversation reset");
            }
            None => tracing::debug!("reset with no session"),
        }
        Vec::new()
    }

    /// [`ChatApp::reset`], reporting whether there was a session to reset.
    pub fn reset_status(&mut self) -> &'static str {
        let initialized = self.is_initialized();
        self.reset();
        if initialized {
            RESET_MESSAGE
        } else {
            NO_AGENT_TO_RESET_MESSAGE
        }
    }

    /// Close the session's connections and drop it. Safe to repeat.
    pub fn disconnect(&mut self) -> std::result::Result<String, String> {
        let Some(mut session) = self.session.take() else {
            return Ok(DISCONNECTED_MESSAGE.to_string());
        };

        match self.bridge.run(session.disconnect()) {
            Ok(()) => {}
            Err(ChatError::Busy) => {
                self.session = Some(session);
                return Err(format!("Error: {}", ChatError::Busy));
            }
            Err(error) => {
                tracing::warn!(%error, "error during disconnect");
            }
        }
        Ok(DISCONNECTED_MESSAGE.to_string())
    }

    /// Disconnect and release the runtime. Also runs on drop.
    pub fn shutdown(&mut self) {
        if let Err(message) = self.disconnect() {
            tracing::warn!(%message, "disconnect failed during shutdown");
        }
        self.bridge.release();
    }
}

impl Drop for ChatApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}
