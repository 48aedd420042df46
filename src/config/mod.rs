//! Configuration (layered: CLI flags > env > `.env` file).

pub mod servers;

pub use servers::{
    build_server_configs, default_servers_path, RawServerEntry, ServerConfig, ServersFile,
    Transport,
};

use std::fmt;
use std::time::Duration;

/// Default model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Default bound on opening one MCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Language-model provider credentials.
///
/// Immutable after construction. The key never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    openai_api_key: String,
}

impl ApiCredentials {
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
        }
    }

    pub fn openai_api_key(&self) -> &str {
        &self.openai_api_key
    }

    pub fn is_blank(&self) -> bool {
        self.openai_api_key.trim().is_empty()
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}

/// Process configuration resolved from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub connect_timeout: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Load from environment variables (OPENAI_API_KEY, OPENAI_BASE_URL, ...).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.api_key = non_blank("OPENAI_API_KEY");
        config.base_url = non_blank("OPENAI_BASE_URL");
        if let Some(model) = non_blank("MCP_CHAT_MODEL") {
            config.model = model;
        }
        if let Some(secs) = non_blank("MCP_CHAT_CONNECT_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) => config.connect_timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(
                    value = %secs,
                    "ignoring invalid MCP_CHAT_CONNECT_TIMEOUT_SECS"
                ),
            }
        }

        config
    }

    pub fn credentials(&self) -> Option<ApiCredentials> {
        self.api_key.clone().map(ApiCredentials::new)
    }
}
