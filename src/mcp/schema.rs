//! MCP schema types.

use serde::{Deserialize, Serialize};

/// Schema for a tool exposed by an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolSchema {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: serde_json::Value,
}

impl McpToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema,
        }
    }
}

/// Result of a successful MCP tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallOutput {
    pub structured_content: Option<serde_json::Value>,
    pub text_content: Option<String>,
    pub content: Vec<serde_json::Value>,
}

impl ToolCallOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text_content: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn into_value_or_text(self) -> serde_json::Value {
        if let Some(structured) = self.structured_content {
            return structured;
        }
        if let Some(text) = self.text_content {
            return serde_json::Value::String(text);
        }
        serde_json::Value::Array(self.content)
    }

    /// Render the output as the string a chat model receives.
    pub fn into_model_text(self) -> String {
        match self.into_value_or_text() {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        }
    }
}

#[cfg(feature = "mcp")]
impl From<rmcp::model::Tool> for McpToolSchema {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(|d| d.into_owned()),
            input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
        }
    }
}

#[cfg(feature = "mcp")]
impl ToolCallOutput {
    /// Convert an rmcp call result. A result flagged as an error becomes
    /// [`ChatError::ToolExecution`](crate::error::ChatError::ToolExecution)
    /// for `tool`.
    pub fn from_call_result(
        tool: &str,
        result: rmcp::model::CallToolResult,
    ) -> crate::error::Result<Self> {
        use rmcp::model::ResourceContents;

        let texts: Vec<String> = result
            .content
            .iter()
            .filter_map(|item| {
                if let Some(text) = item.as_text() {
                    return Some(text.text.clone());
                }
                match &item.as_resource()?.resource {
                    ResourceContents::TextResourceContents { text, .. } => Some(text.clone()),
                    _ => None,
                }
            })
            .collect();
        let text_content = (!texts.is_empty()).then(|| texts.join("\n"));

        if result.is_error == Some(true) {
            let message = result
                .structured_content
                .as_ref()
                .map(ToString::to_string)
                .or(text_content)
                .unwrap_or_else(|| "tool reported an error".to_string());
            return Err(crate::error::ChatError::ToolExecution {
                tool_name: tool.to_string(),
                message,
            });
        }

        Ok(Self {
            content: result
                .content
                .iter()
                .filter_map(|item| serde_json::to_value(item).ok())
                .collect(),
            structured_content: result.structured_content,
            text_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_content_wins_over_text() {
        let output = ToolCallOutput {
            structured_content: Some(json!({"temp": 21})),
            text_content: Some("21 degrees".into()),
            content: Vec::new(),
        };
        assert_eq!(output.into_model_text(), r#"{"temp":21}"#);
    }

    #[test]
    fn text_is_passed_through_unquoted() {
        assert_eq!(ToolCallOutput::text("plain").into_model_text(), "plain");
    }

    #[cfg(feature = "mcp")]
    fn call_result(value: serde_json::Value) -> rmcp::model::CallToolResult {
        serde_json::from_value(value).unwrap()
    }

    #[cfg(feature = "mcp")]
    #[test]
    fn call_result_text_parts_reach_the_model_as_lines() {
        let output = ToolCallOutput::from_call_result(
            "forecast",
            call_result(json!({
                "content": [
                    { "type": "text", "text": "Oslo: 4C" },
                    { "type": "text", "text": "Bergen: 7C" }
                ]
            })),
        )
        .unwrap();
        assert_eq!(output.content.len(), 2);
        assert_eq!(output.into_model_text(), "Oslo: 4C\nBergen: 7C");
    }

    #[cfg(feature = "mcp")]
    #[test]
    fn error_result_fails_the_call_with_its_text() {
        let err = ToolCallOutput::from_call_result(
            "forecast",
            call_result(json!({
                "content": [{ "type": "text", "text": "unknown city" }],
                "isError": true
            })),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Tool execution error: forecast: unknown city");
    }

    #[cfg(feature = "mcp")]
    #[test]
    fn rmcp_tool_descriptor_converts() {
        let mut input = serde_json::Map::new();
        input.insert("type".into(), json!("object"));
        let schema = McpToolSchema::from(rmcp::model::Tool::new("forecast", "Weather by city", input));
        assert_eq!(
            schema,
            McpToolSchema::new("forecast", "Weather by city", json!({"type": "object"}))
        );
    }
}
