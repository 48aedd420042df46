//! MCP server descriptors: raw UI entries to typed connection configs.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{ChatError, Result};

/// Number of raw fields per server slot: url, name, transport, token.
pub const FIELDS_PER_ENTRY: usize = 4;

/// Wire mechanism used to reach a tool-provider server.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Transport {
    /// Persistent streamable HTTP.
    #[default]
    #[strum(to_string = "http", serialize = "streamable-http", serialize = "streamable_http")]
    StreamableHttp,
    /// Legacy server-sent events.
    #[strum(to_string = "sse")]
    Sse,
}

/// Validated connection settings for one MCP server.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub url: String,
    pub name: String,
    pub transport: Transport,
    pub bearer_token: Option<String>,
}

impl ServerConfig {
    pub fn new(url: impl Into<String>, name: impl Into<String>, transport: Transport) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            transport,
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("url", &self.url)
            .field("name", &self.name)
            .field("transport", &self.transport)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One server slot exactly as the user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawServerEntry {
    pub url: String,
    pub name: String,
    pub transport: String,
    pub token: String,
}

impl RawServerEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn transport(mut self, transport: impl Into<String>) -> Self {
        self.transport = transport.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Group a flat field list (`url, name, transport, token, url, ...`) into entries.
    ///
    /// A trailing group with fewer than four fields is ignored.
    pub fn from_flat<S: AsRef<str>>(fields: &[S]) -> Vec<Self> {
        fields
            .chunks_exact(FIELDS_PER_ENTRY)
            .map(|chunk| Self {
                url: chunk[0].as_ref().to_string(),
                name: chunk[1].as_ref().to_string(),
                transport: chunk[2].as_ref().to_string(),
                token: chunk[3].as_ref().to_string(),
            })
            .collect()
    }

    /// Parse the CLI form `url[,name[,transport[,token]]]`.
    pub fn parse_arg(raw: &str) -> Self {
        let mut parts = raw.splitn(FIELDS_PER_ENTRY, ',');
        let mut next = || parts.next().unwrap_or_default().to_string();
        Self {
            url: next(),
            name: next(),
            transport: next(),
            token: next(),
        }
    }
}

/// Build typed configs from raw entries.
///
/// Entries with a blank URL are unused slots and are dropped. The result
/// preserves the relative order of the kept entries; an all-blank input
/// yields an empty list.
pub fn build_server_configs(entries: &[RawServerEntry]) -> Result<Vec<ServerConfig>> {
    let mut configs = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let url = entry.url.trim();
        if url.is_empty() {
            continue;
        }

        let name = match entry.name.trim() {
            "" => format!("server_{}", index + 1),
            name => name.to_string(),
        };

        let transport = match entry.transport.trim() {
            "" => Transport::default(),
            raw => raw.parse::<Transport>().map_err(|_| {
                ChatError::InvalidConfig(format!(
                    "unknown transport '{raw}' for server '{name}' (expected 'http' or 'sse')"
                ))
            })?,
        };

        let bearer_token = match entry.token.trim() {
            "" => None,
            token => Some(token.to_string()),
        };

        configs.push(ServerConfig {
            url: url.to_string(),
            name,
            transport,
            bearer_token,
        });
    }
    Ok(configs)
}

/// On-disk server list (`servers.toml`).
///
/// ```toml
/// [[servers]]
/// url = "http://localhost:8000/mcp"
/// name = "memory"
/// transport = "sse"
/// bearer_token = "..."
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServersFile {
    #[serde(default)]
    pub servers: Vec<ServerFileEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerFileEntry {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl ServersFile {
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ChatError::InvalidConfig(format!("servers file: {e}")))
    }

    /// Load a servers file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ChatError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    /// Load `~/.mcp-chat/servers.toml`, treating a missing file as empty.
    pub fn load_default() -> Result<Self> {
        let path = default_servers_path();
        match fs::read_to_string(&path) {
            Ok(raw) => Self::parse(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ChatError::InvalidConfig(format!(
                "cannot read {}: {err}",
                path.display()
            ))),
        }
    }

    pub fn into_entries(self) -> Vec<RawServerEntry> {
        self.servers
            .into_iter()
            .map(|s| RawServerEntry {
                url: s.url,
                name: s.name.unwrap_or_default(),
                transport: s.transport.unwrap_or_default(),
                token: s.bearer_token.unwrap_or_default(),
            })
            .collect()
    }
}

pub fn default_servers_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".mcp-chat"))
        .unwrap_or_else(|| PathBuf::from(".mcp-chat"))
        .join("servers.toml")
}
