//! HTTP Transport Implementation
//!
//! Talks to a Maestro workflow server over plain HTTP.
//!
//! # Endpoints
//!
//! - `POST /chat/stream` - run the workflow on `{"prompt": ...}`, streaming
//!   one server-sent event per step
//! - `GET /health` - `{"status": "..."}`
//! - `GET /diagram` - `{"diagram": "..."}` (Mermaid text)

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;

use super::sse::EventStreamDecoder;
use super::traits::{DiagramDescription, TransportError, WorkflowTransport};
use crate::config::ClientConfig;
use crate::events::StreamEvent;

const STREAM_PATH: &str = "/chat/stream";
const HEALTH_PATH: &str = "/health";
const DIAGRAM_PATH: &str = "/diagram";

#[derive(Serialize)]
struct StreamRequest<'a> {
    prompt: &'a str,
}

/// HTTP workflow backend client
#[derive(Clone, Debug)]
pub struct HttpTransport {
    /// Base URL without trailing slash
    base_url: String,
    /// Timeout for the health probe
    health_timeout: Duration,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for `base_url`
    ///
    /// Only connection establishment is bounded by `connect_timeout`; a
    /// running workflow stream may take as long as the backend needs.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            health_timeout,
            http_client,
        })
    }

    /// Create from a loaded [`ClientConfig`]
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::new(
            config.backend_url.clone(),
            config.connect_timeout(),
            config.health_timeout(),
        )
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into [`TransportError::Status`]
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}

#[async_trait]
impl WorkflowTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn stream(
        &self,
        prompt: &str,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<(), TransportError> {
        let url = self.url(STREAM_PATH);
        tracing::debug!(url = %url, "Opening workflow stream");

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&StreamRequest { prompt })
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let mut body = response.bytes_stream();
        let mut decoder = EventStreamDecoder::new();

        while let Some(chunk) = body.next().await {
            let bytes = chunk.map_err(|e| TransportError::Interrupted(e.to_string()))?;
            for event in decoder.push(&bytes) {
                if sink.send(event).await.is_err() {
                    tracing::debug!("Event receiver dropped, abandoning stream");
                    return Ok(());
                }
            }
        }

        if let Some(event) = decoder.finish() {
            if sink.send(event).await.is_err() {
                return Ok(());
            }
        }

        if decoder.skipped() > 0 {
            tracing::warn!(skipped = decoder.skipped(), "Stream contained undecodable lines");
        }

        Ok(())
    }

    async fn health(&self) -> Result<String, TransportError> {
        let response = self
            .http_client
            .get(self.url(HEALTH_PATH))
            .timeout(self.health_timeout)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let data: serde_json::Value = response.json().await?;
        if let Some(status) = data.as_str() {
            return Ok(status.to_string());
        }
        data.get("status")
            .and_then(serde_json::Value::as_str)
            .map(String::from)
            .ok_or_else(|| TransportError::Protocol(format!("no status in {data}")))
    }

    async fn fetch_diagram(&self) -> Result<DiagramDescription, TransportError> {
        let response = self.http_client.get(self.url(DIAGRAM_PATH)).send().await?;
        let response = Self::check_status(response).await?;

        Ok(response.json::<DiagramDescription>().await?)
    }
}
