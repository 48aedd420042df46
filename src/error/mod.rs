//! Error types for mcp-chat.

pub mod kind;

pub use kind::{ErrorKind, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all session, connection and model operations.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Please provide a message.")]
    EmptyMessage,

    #[error("Invalid server configuration: {0}")]
    InvalidConfig(String),

    #[error("Agent is not initialized")]
    NotInitialized,

    #[error("Failed to connect to MCP server '{server}' at {url}: {message}")]
    Connect {
        server: String,
        url: String,
        message: String,
    },

    #[error("Failed to close MCP server '{server}': {message}")]
    Disconnect { server: String, message: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("MCP server '{server}' error: {message}")]
    Server { server: String, message: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Another operation is already in progress")]
    Busy,

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ChatError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a connect error for one server.
    pub fn connect(
        server: impl Into<String>,
        url: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Connect {
            server: server.into(),
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Classify this error into the session manager taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyMessage | Self::InvalidConfig(_) | Self::NotInitialized => {
                ErrorKind::Validation
            }
            Self::Connect { .. } => ErrorKind::Connect,
            Self::Disconnect { .. } => ErrorKind::Disconnect,
            Self::Model(_)
            | Self::Api { .. }
            | Self::Network(_)
            | Self::Serialization(_)
            | Self::Authentication(_)
            | Self::RateLimited { .. }
            | Self::Timeout(_) => ErrorKind::Model,
            Self::ToolExecution { .. } | Self::Server { .. } | Self::ToolNotFound(_) => {
                ErrorKind::Tool
            }
            Self::Busy | Self::Runtime(_) | Self::Internal(_) | Self::InvalidState(_) => {
                ErrorKind::Bridge
            }
        }
    }

    /// Whether a model request failing with this error may succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            Self::Authentication(_) | Self::Api { status: 401 | 403, .. } => {
                RecoverySuggestion::CheckCredentials
            }
            Self::InvalidConfig(_) | Self::Connect { .. } => {
                RecoverySuggestion::CheckConfiguration
            }
            Self::NotInitialized => RecoverySuggestion::Initialize,
            Self::EmptyMessage => RecoverySuggestion::FixInput,
            Self::Timeout(_) => RecoverySuggestion::IncreaseTimeout,
            Self::Busy => RecoverySuggestion::RetryWithBackoff,
            _ if self.is_retryable() => RecoverySuggestion::RetryWithBackoff,
            _ => RecoverySuggestion::Reconnect,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ChatError>;
