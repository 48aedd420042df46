//! Legacy MCP SSE transport.
//!
//! The client opens a GET event stream; the server's first `endpoint`
//! event names the URL that client messages are POSTed to, and server
//! messages arrive as `message` events on the stream.

use std::future::Future;

use futures::StreamExt;
use reqwest::Url;
use reqwest_eventsource::{retry::Never, Event, EventSource, RequestBuilderExt};
use rmcp::model::ServerJsonRpcMessage;
use rmcp::service::{RoleClient, RxJsonRpcMessage, TxJsonRpcMessage};
use rmcp::transport::Transport;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SseTransportError {
    #[error("SSE request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SSE stream error: {0}")]
    Stream(String),
    #[error("invalid SSE endpoint '{0}'")]
    Endpoint(String),
    #[error("SSE stream ended before the server announced its endpoint")]
    NoEndpoint,
}

pub struct SseTransport {
    client: reqwest::Client,
    endpoint: Url,
    events: EventSource,
}

impl SseTransport {
    /// Open the event stream and wait for the `endpoint` event.
    pub async fn start(client: reqwest::Client, url: &str) -> Result<Self, SseTransportError> {
        let base = Url::parse(url).map_err(|_| SseTransportError::Endpoint(url.to_string()))?;
        let mut events = client
            .get(base.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .eventsource()
            .map_err(|e| SseTransportError::Stream(e.to_string()))?;
        events.set_retry_policy(Box::new(Never));

        while let Some(event) = events.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) if message.event == "endpoint" => {
                    let endpoint = base
                        .join(message.data.trim())
                        .map_err(|_| SseTransportError::Endpoint(message.data.clone()))?;
                    tracing::debug!(%endpoint, "SSE endpoint announced");
                    return Ok(Self {
                        client,
                        endpoint,
                        events,
                    });
                }
                Ok(Event::Message(message)) => {
                    tracing::debug!(event = %message.event, "ignoring SSE event before endpoint");
                }
                Err(error) => {
                    events.close();
                    return Err(SseTransportError::Stream(error.to_string()));
                }
            }
        }
        Err(SseTransportError::NoEndpoint)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Transport<RoleClient> for SseTransport {
    type Error = SseTransportError;

    fn send(
        &mut self,
        item: TxJsonRpcMessage<RoleClient>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        async move {
            client
                .post(endpoint)
                .json(&item)
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        }
    }

    fn receive(&mut self) -> impl Future<Output = Option<RxJsonRpcMessage<RoleClient>>> + Send {
        async move {
            while let Some(event) = self.events.next().await {
                match event {
                    Ok(Event::Message(message)) if message.event == "message" => {
                        match serde_json::from_str::<ServerJsonRpcMessage>(&message.data) {
                            Ok(parsed) => return Some(parsed),
                            Err(error) => {
                                tracing::warn!(%error, "dropping unparseable SSE message")
                            }
                        }
                    }
                    Ok(_) => continue,
                    Err(error) => {
                        tracing::debug!(%error, "SSE stream ended");
                        self.events.close();
                        return None;
                    }
                }
            }
            None
        }
    }

    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.events.close();
        std::future::ready(Ok(()))
    }
}
