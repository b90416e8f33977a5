//! Workflow Backend Transport
//!
//! This module provides access to the workflow backend through a common trait
//! interface, so the session controller, diagram pipeline and health monitor
//! never see HTTP details.
//!
//! # Available Transports
//!
//! - **HTTP**: `reqwest` client speaking server-sent events (default)
//!
//! # Usage
//!
//! ```ignore
//! use maestro_client_core::transport::{HttpTransport, WorkflowTransport};
//!
//! let transport = HttpTransport::from_config(&config)?;
//! let (tx, mut rx) = tokio::sync::mpsc::channel(100);
//! transport.stream("Write a haiku", tx).await?;
//! ```

mod http;
mod sse;
mod traits;

pub use http::HttpTransport;
pub use sse::EventStreamDecoder;
pub use traits::{DiagramDescription, TransportError, WorkflowTransport};
