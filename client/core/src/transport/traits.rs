//! Transport Traits
//!
//! The contract between the client core and whatever carries bytes to the
//! workflow backend. Everything above this trait is protocol-agnostic; the
//! HTTP/SSE implementation lives next door in `http.rs`, and tests plug in
//! scripted transports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::StreamEvent;

/// Diagram description returned by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramDescription {
    /// Textual diagram (Mermaid syntax)
    pub diagram: String,
}

impl DiagramDescription {
    /// Wrap a diagram text
    pub fn new(diagram: impl Into<String>) -> Self {
        Self {
            diagram: diagram.into(),
        }
    }
}

/// Errors raised by a transport
///
/// The `Display` text is user-facing: it is what ends up after
/// `Stream failed:` in the transcript.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed
    #[error("{0}")]
    Connect(String),

    /// The backend answered with a non-success status
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly empty)
        body: String,
    },

    /// The body ended abnormally after the stream had started
    #[error("stream interrupted: {0}")]
    Interrupted(String),

    /// A response body could not be decoded
    #[error("invalid response: {0}")]
    Decode(String),

    /// The response decoded but did not have the expected shape
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Connect(err.to_string())
        }
    }
}

/// Workflow backend transport
///
/// Each call performs exactly one network operation. No retries, no caching.
#[async_trait]
pub trait WorkflowTransport: Send + Sync {
    /// Get the transport name (e.g., "HTTP")
    fn name(&self) -> &str;

    /// Stream a prompt through the workflow
    ///
    /// Every decoded unit of output is sent into `sink` in arrival order, and
    /// the next unit is not read until the send completes. Returns `Ok` once
    /// the backend signals end-of-stream, or early if the receiving side of
    /// `sink` has gone away. Events already sent are never retracted, even
    /// when an error is returned afterwards.
    async fn stream(
        &self,
        prompt: &str,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<(), TransportError>;

    /// Probe backend health, returning the reported status string
    async fn health(&self) -> Result<String, TransportError>;

    /// Fetch the workflow's diagram description
    async fn fetch_diagram(&self) -> Result<DiagramDescription, TransportError>;
}

#[async_trait]
impl<T: WorkflowTransport + ?Sized> WorkflowTransport for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn stream(
        &self,
        prompt: &str,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<(), TransportError> {
        (**self).stream(prompt, sink).await
    }

    async fn health(&self) -> Result<String, TransportError> {
        (**self).health().await
    }

    async fn fetch_diagram(&self) -> Result<DiagramDescription, TransportError> {
        (**self).fetch_diagram().await
    }
}
