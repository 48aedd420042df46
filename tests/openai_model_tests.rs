mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{EventLog, MockHandle};
use mcp_chat::config::ApiCredentials;
use mcp_chat::error::ChatError;
use mcp_chat::mcp::ToolConnection;
use mcp_chat::model::{ChatModel, ModelSettings, OpenAiChatModel};
use mcp_chat::session::ConnectionSet;
use mcp_chat::types::{Role, Turn};
use mcp_chat::util::retry::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(1),
        multiplier: 1.0,
    }
}

fn model(server: &MockServer, max_attempts: u32) -> OpenAiChatModel {
    let settings = ModelSettings::builder()
        .base_url(server.uri())
        .max_tool_iterations(3)
        .build();
    OpenAiChatModel::new(&ApiCredentials::new("test-key"), settings)
        .unwrap()
        .with_retry_policy(test_retry_policy(max_attempts))
}

fn text_completion(text: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }]
    })
}

fn tool_call_completion(id: &str, name: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": { "name": name, "arguments": "{\"query\":\"rust\"}" }
                }]
            },
            "finish_reason": "tool_calls"
        }]
    })
}

fn tool_set(log: &Arc<EventLog>, failing: bool) -> ConnectionSet {
    let handle = MockHandle::new("alpha", log.clone());
    let handle: Box<dyn ToolConnection> = if failing {
        Box::new(handle.failing_calls())
    } else {
        Box::new(handle)
    };
    ConnectionSet::from_handles(vec![handle])
}

#[tokio::test]
async fn plain_reply_extends_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("\"content\":\"earlier\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let mut tools = ConnectionSet::from_handles(Vec::new());
    let reply = model(&server, 1)
        .invoke("hello", vec![Turn::user("earlier")], &tools)
        .await
        .expect("completion should succeed");

    assert_eq!(reply.reply, "Hi there");
    let roles: Vec<_> = reply.history.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    assert_eq!(reply.history[1].content, "hello");
    tools.close().await;
}

#[tokio::test]
async fn tool_calls_route_to_mcp_and_feed_results_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"name\":\"alpha_info\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(tool_call_completion("call_1", "alpha_info")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"tool_call_id\":\"call_1\""))
        .and(body_string_contains("alpha:alpha_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("Done.")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let log = Arc::new(EventLog::default());
    let mut tools = tool_set(&log, false);
    let reply = model(&server, 1)
        .invoke("look it up", Vec::new(), &tools)
        .await
        .expect("tool loop should finish");

    assert_eq!(reply.reply, "Done.");
    assert_eq!(log.events(), vec!["call alpha:alpha_info"]);
    let roles: Vec<_> = reply.history.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert!(!reply.history[1].is_visible());
    tools.close().await;
}

#[tokio::test]
async fn tool_failures_are_reported_to_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(tool_call_completion("call_9", "search")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("backend unavailable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("Sorry.")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let log = Arc::new(EventLog::default());
    let mut tools = tool_set(&log, true);
    let reply = model(&server, 1)
        .invoke("search please", Vec::new(), &tools)
        .await
        .expect("tool errors should not abort the turn");

    assert_eq!(reply.reply, "Sorry.");
    assert!(reply.history[2].content.starts_with("Error: "));
    tools.close().await;
}

#[tokio::test]
async fn endless_tool_calls_hit_the_iteration_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(tool_call_completion("call_x", "search")),
        )
        .expect(3)
        .mount(&server)
        .await;

    let log = Arc::new(EventLog::default());
    let mut tools = tool_set(&log, false);
    let err = model(&server, 1)
        .invoke("loop", Vec::new(), &tools)
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Model(msg) if msg.contains("3 tool iterations")));
    assert_eq!(log.count("call"), 3);
    tools.close().await;
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tools = ConnectionSet::from_handles(Vec::new());
    let err = model(&server, 3)
        .invoke("hi", Vec::new(), &tools)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Authentication(msg) if msg == "Incorrect API key provided"));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("Recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let tools = ConnectionSet::from_handles(Vec::new());
    let reply = model(&server, 2)
        .invoke("hi", Vec::new(), &tools)
        .await
        .expect("second attempt should succeed");
    assert_eq!(reply.reply, "Recovered");
}
