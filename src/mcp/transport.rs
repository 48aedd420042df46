//! Connector that opens rmcp client sessions over HTTP transports.

use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{ClientInfo, ProtocolVersion};
use rmcp::service::ServiceExt;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;

use crate::config::{ServerConfig, Transport, DEFAULT_CONNECT_TIMEOUT};
use crate::error::{ChatError, Result};
use crate::util::http::bearer_headers;
use crate::util::timeout::with_timeout;

use super::client::{describe_initialize_error, McpRunningService, RmcpConnection};
use super::connection::{Connector, ToolConnection};
use super::sse::SseTransport;

/// Opens one rmcp session per server config, completing the MCP
/// initialize handshake before returning.
#[derive(Debug, Clone)]
pub struct RmcpConnector {
    connect_timeout: Duration,
}

impl Default for RmcpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl RmcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn http_client(&self, config: &ServerConfig) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.connect_timeout);
        if let Some(token) = config.bearer_token.as_deref() {
            builder = builder.default_headers(bearer_headers(token)?);
        }
        builder.build().map_err(ChatError::from)
    }

    async fn serve(&self, config: &ServerConfig) -> Result<McpRunningService> {
        let http = self.http_client(config)?;
        let client_info = ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            ..Default::default()
        };

        let served = match config.transport {
            Transport::StreamableHttp => {
                let transport = StreamableHttpClientTransport::with_client(
                    http,
                    StreamableHttpClientTransportConfig::with_uri(config.url.as_str()),
                );
                client_info.into_dyn().serve(transport).await
            }
            Transport::Sse => {
                let transport = SseTransport::start(http, &config.url)
                    .await
                    .map_err(|e| ChatError::connect(&config.name, &config.url, e))?;
                client_info.into_dyn().serve(transport).await
            }
        };

        served.map_err(|e| ChatError::connect(&config.name, &config.url, describe_initialize_error(e)))
    }
}

#[async_trait]
impl Connector for RmcpConnector {
    async fn open(&self, config: &ServerConfig) -> Result<Box<dyn ToolConnection>> {
        tracing::info!(
            server = %config.name,
            url = %config.url,
            transport = %config.transport,
            "connecting to MCP server"
        );
        let session = with_timeout(self.connect_timeout, self.serve(config)).await?;
        tracing::info!(server = %config.name, "MCP server connected");
        Ok(Box::new(RmcpConnection::new(config.name.clone(), session)))
    }
}
