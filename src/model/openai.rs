//! OpenAI Chat Completions model with an MCP tool loop.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ApiCredentials;
use crate::error::{ChatError, Result};
use crate::mcp::McpToolSchema;
use crate::session::ConnectionSet;
use crate::types::{Role, ToolCall, Turn};
use crate::util::http::{json_bearer_headers, status_to_error};
use crate::util::retry::RetryPolicy;

use super::{ChatModel, ModelReply, ModelSettings};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    settings: ModelSettings,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for OpenAiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatModel")
            .field("base_url", &self.base_url)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl OpenAiChatModel {
    pub fn new(credentials: &ApiCredentials, settings: ModelSettings) -> Result<Self> {
        if credentials.is_blank() {
            return Err(ChatError::Authentication("OpenAI API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = settings
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            api_key: credentials.openai_api_key().to_string(),
            base_url,
            settings,
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.settings.model
    }

    fn build_request_body(&self, history: &[Turn], tools: &[Value]) -> Value {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(instructions) = self.settings.instructions.as_deref() {
            messages.push(json!({ "role": "system", "content": instructions }));
        }
        messages.extend(history.iter().map(turn_to_openai));

        let mut body = serde_json::Map::new();
        body.insert("model".into(), self.settings.model.clone().into());
        body.insert("messages".into(), messages.into());
        if let Some(max) = self.settings.max_tokens {
            body.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = self.settings.temperature {
            body.insert("temperature".into(), temp.into());
        }
        if !tools.is_empty() {
            body.insert("tools".into(), tools.to_vec().into());
        }
        Value::Object(body)
    }

    async fn complete(&self, body: &Value) -> Result<AssistantMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .headers(json_bearer_headers(&self.api_key)?)
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: OpenAiChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Model("no choices in OpenAI response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                // Unparseable arguments are kept verbatim as a string.
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments)),
            })
            .collect();

        Ok(AssistantMessage {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(
        &self,
        message: &str,
        history: Vec<Turn>,
        tools: &ConnectionSet,
    ) -> Result<ModelReply> {
        let catalog = tools.catalog().await?;
        let tool_defs: Vec<Value> = catalog.tools.iter().map(tool_definition).collect();

        let mut history = history;
        history.push(Turn::user(message));

        let max_iterations = self.settings.max_tool_iterations.max(1);
        for iteration in 1..=max_iterations {
            let body = self.build_request_body(&history, &tool_defs);
            debug!(model = %self.settings.model, iteration, "OpenAI chat completion");
            let assistant = self
                .retry_policy
                .execute(|| self.complete(&body))
                .await?;

            if assistant.tool_calls.is_empty() {
                history.push(Turn::assistant(assistant.text.clone()));
                return Ok(ModelReply {
                    reply: assistant.text,
                    history,
                });
            }

            let calls = assistant.tool_calls.clone();
            history.push(Turn::assistant_tool_calls(assistant.text, assistant.tool_calls));
            for call in calls {
                let content = match tools
                    .call_tool(&catalog, &call.name, call.arguments.clone())
                    .await
                {
                    Ok(output) => output.into_model_text(),
                    Err(error) => {
                        tracing::warn!(tool = %call.name, %error, "MCP tool call failed");
                        format!("Error: {error}")
                    }
                };
                history.push(Turn::tool_result(call.id, content));
            }
        }

        Err(ChatError::Model(format!(
            "model did not finish within {max_iterations} tool iterations"
        )))
    }
}

struct AssistantMessage {
    text: String,
    tool_calls: Vec<ToolCall>,
}

fn tool_definition(tool: &McpToolSchema) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.clone().unwrap_or_default(),
            "parameters": tool.input_schema,
        }
    })
}

fn turn_to_openai(turn: &Turn) -> Value {
    match turn.role {
        Role::User => json!({ "role": "user", "content": turn.content }),
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": turn.tool_call_id.clone().unwrap_or_default(),
            "content": turn.content,
        }),
        Role::Assistant if turn.tool_calls.is_empty() => {
            json!({ "role": "assistant", "content": turn.content })
        }
        Role::Assistant => {
            let tool_calls: Vec<Value> = turn
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": arguments_text(&tc.arguments),
                        }
                    })
                })
                .collect();
            let content = if turn.content.is_empty() {
                Value::Null
            } else {
                Value::String(turn.content.clone())
            };
            json!({ "role": "assistant", "content": content, "tool_calls": tool_calls })
        }
    }
}

/// Arguments as the API expects them: a JSON-encoded string. A string value
/// is already the raw text the model sent.
fn arguments_text(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

// OpenAI API response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}
