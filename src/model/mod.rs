//! The language-model dependency a session forwards chat turns to.

pub mod openai;

pub use openai::OpenAiChatModel;

use async_trait::async_trait;
use bon::Builder;

use crate::config::DEFAULT_MODEL;
use crate::error::Result;
use crate::session::ConnectionSet;
use crate::types::Turn;

/// Upper bound on model round trips within one chat turn.
pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 20;

/// What a model call produces: the reply text and the full updated history.
///
/// `history` holds the prior turns, the new user turn, any tool bookkeeping
/// turns and the final assistant turn, in order.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub reply: String,
    pub history: Vec<Turn>,
}

/// A language model that can use a session's MCP tools.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Answer `message` given the prior `history`, calling tools from
    /// `tools` as needed.
    async fn invoke(
        &self,
        message: &str,
        history: Vec<Turn>,
        tools: &ConnectionSet,
    ) -> Result<ModelReply>;
}

/// Model request settings.
#[derive(Debug, Clone, Builder)]
pub struct ModelSettings {
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    #[builder(into)]
    pub base_url: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Sent as a system message ahead of the history.
    #[builder(into)]
    pub instructions: Option<String>,
    #[builder(default = DEFAULT_MAX_TOOL_ITERATIONS)]
    pub max_tool_iterations: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
