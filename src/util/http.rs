//! Shared HTTP helpers: bearer auth headers and status mapping.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::ChatError;

/// Build a header map carrying `Authorization: Bearer <token>`.
///
/// The value is marked sensitive so reqwest never prints it.
pub fn bearer_headers(token: &str) -> Result<HeaderMap, ChatError> {
    let mut headers = HeaderMap::new();
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        ChatError::InvalidConfig("bearer token contains characters not allowed in a header".into())
    })?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Bearer headers plus a JSON content type, for API requests.
pub fn json_bearer_headers(token: &str) -> Result<HeaderMap, ChatError> {
    let mut headers = bearer_headers(token)?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> ChatError {
    match status {
        401 | 403 => ChatError::Authentication(error_message(body)),
        429 => ChatError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => ChatError::api(status, error_message(body)),
    }
}

/// Pull `error.message` out of an OpenAI-style error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_is_sensitive() {
        let headers = bearer_headers("abc").unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer abc");
        assert!(value.is_sensitive());
    }

    #[test]
    fn newline_in_token_is_rejected() {
        assert!(matches!(
            bearer_headers("abc\ndef"),
            Err(ChatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn status_mapping_extracts_provider_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","retry_after":1.5}}"#;
        assert!(matches!(
            status_to_error(401, body),
            ChatError::Authentication(msg) if msg == "Incorrect API key provided"
        ));
        assert!(matches!(
            status_to_error(429, body),
            ChatError::RateLimited { retry_after_ms: Some(1500) }
        ));
        assert!(matches!(
            status_to_error(500, "upstream exploded"),
            ChatError::Api { status: 500, message } if message == "upstream exploded"
        ));
    }
}
