//! Convenience re-exports for common use.

pub use crate::app::ChatApp;
pub use crate::config::{ApiCredentials, AppConfig, RawServerEntry, ServerConfig, Transport};
pub use crate::error::{ChatError, ErrorKind, Result};
pub use crate::model::{ChatModel, ModelReply, ModelSettings};
pub use crate::session::{ConnectionSet, Orchestrator, Session, SessionState};
pub use crate::types::{Role, Turn};
