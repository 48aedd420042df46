//! Error classification and recovery.

use serde::{Deserialize, Serialize};

/// Which layer of the session manager an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Blank message or malformed config; never reaches the model.
    Validation,
    /// A tool-provider handle failed to open.
    Connect,
    /// The language-model call failed.
    Model,
    /// A close call raised. Logged, never surfaced.
    Disconnect,
    /// A routed MCP tool call failed.
    Tool,
    /// The sync/async bridge rejected or lost the operation.
    Bridge,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    FixInput,
    Initialize,
    CheckCredentials,
    CheckConfiguration,
    IncreaseTimeout,
    RetryWithBackoff,
    Reconnect,
}
