//! Command-line arguments for the `mcp-chat` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{ApiCredentials, AppConfig, RawServerEntry, ServersFile};
use crate::error::{ChatError, Result};
use crate::model::ModelSettings;
use crate::slots::MAX_SERVER_SLOTS;

/// Chat with an AI agent that can call tools on MCP servers.
#[derive(Parser, Debug)]
#[command(name = "mcp-chat", version, about = "Chat with an agent backed by MCP tool servers")]
pub struct Cli {
    /// OpenAI API key (defaults to OPENAI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL (defaults to OPENAI_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model id (defaults to MCP_CHAT_MODEL, then gpt-4.1-mini)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,

    /// Max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// MCP server as `url[,name[,transport[,token]]]`; repeat for more
    #[arg(long = "server", value_name = "SERVER")]
    pub servers: Vec<String>,

    /// TOML file with `[[servers]]` tables, used when no --server is given
    #[arg(long)]
    pub servers_file: Option<PathBuf>,

    /// Seconds to wait for each MCP server to connect
    #[arg(long)]
    pub connect_timeout: Option<u64>,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Layer flags over an environment-derived config.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(key) = self.api_key.clone() {
            config.api_key = Some(key);
        }
        if let Some(url) = self.base_url.clone() {
            config.base_url = Some(url);
        }
        if let Some(model) = self.model.clone() {
            config.model = model;
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config
    }

    pub fn credentials(&self, config: &AppConfig) -> Result<ApiCredentials> {
        config
            .credentials()
            .filter(|c| !c.is_blank())
            .ok_or_else(|| {
                ChatError::Authentication(
                    "OpenAI API key not found. Pass --api-key or set OPENAI_API_KEY.".into(),
                )
            })
    }

    pub fn model_settings(&self, config: &AppConfig) -> ModelSettings {
        ModelSettings::builder()
            .model(config.model.clone())
            .maybe_base_url(config.base_url.clone())
            .maybe_temperature(self.temperature)
            .maybe_max_tokens(self.max_tokens)
            .maybe_instructions(self.system.clone())
            .build()
    }

    /// Server entries from `--server` flags, else from the servers file.
    ///
    /// At most [`MAX_SERVER_SLOTS`] entries are kept.
    pub fn server_entries(&self) -> Result<Vec<RawServerEntry>> {
        let mut entries = if !self.servers.is_empty() {
            self.servers
                .iter()
                .map(|arg| RawServerEntry::parse_arg(arg))
                .collect()
        } else {
            let file = match self.servers_file.as_deref() {
                Some(path) => ServersFile::load(path)?,
                None => ServersFile::load_default()?,
            };
            file.into_entries()
        };

        if entries.len() > MAX_SERVER_SLOTS {
            tracing::warn!(
                given = entries.len(),
                kept = MAX_SERVER_SLOTS,
                "too many MCP servers, ignoring the rest"
            );
            entries.truncate(MAX_SERVER_SLOTS);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_repeated_servers() {
        let cli = Cli::try_parse_from([
            "mcp-chat",
            "--server",
            "http://a/mcp,alpha",
            "--server",
            "http://b/sse,,sse,tok",
        ])
        .unwrap();
        let entries = cli.server_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "alpha");
        assert_eq!(entries[1].transport, "sse");
        assert_eq!(entries[1].token, "tok");
    }

    #[test]
    fn server_entries_are_capped_at_slot_limit() {
        let cli = Cli::try_parse_from([
            "mcp-chat", "--server", "http://1", "--server", "http://2", "--server", "http://3",
            "--server", "http://4",
        ])
        .unwrap();
        let urls: Vec<_> = cli
            .server_entries()
            .unwrap()
            .into_iter()
            .map(|e| e.url)
            .collect();
        assert_eq!(urls, vec!["http://1", "http://2", "http://3"]);
    }

    #[test]
    fn servers_file_is_used_without_server_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[servers]]\nurl = \"http://localhost:8000/mcp\"\nname = \"local\"\n"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from(["mcp-chat", "--servers-file", path.as_str()]).unwrap();
        let entries = cli.server_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "local");
    }

    #[test]
    fn flags_override_environment_config() {
        let cli = Cli::try_parse_from([
            "mcp-chat",
            "--api-key",
            "sk-flag",
            "--model",
            "gpt-4o",
            "--connect-timeout",
            "3",
            "--system",
            "Be brief.",
        ])
        .unwrap();
        let config = cli.apply(AppConfig::default());
        assert_eq!(cli.credentials(&config).unwrap().openai_api_key(), "sk-flag");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));

        let settings = cli.model_settings(&config);
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.instructions.as_deref(), Some("Be brief."));
    }

    #[test]
    fn missing_key_is_an_authentication_error() {
        let cli = Cli::try_parse_from(["mcp-chat"]).unwrap();
        let err = cli.credentials(&AppConfig::default()).unwrap_err();
        assert!(matches!(err, ChatError::Authentication(_)));
    }
}
