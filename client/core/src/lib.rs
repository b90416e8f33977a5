//! Maestro Client Core - Headless Streaming Session Logic
//!
//! This crate holds everything the Maestro workflow chat client does that is
//! not drawing: talking to the workflow backend, turning streamed step results
//! into a transcript, validating and rendering the workflow diagram, and
//! tracking backend health. It can drive the terminal surface, a test harness,
//! or any other front end.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         Host surface                          │
//! │        (TUI: reads snapshots, forwards submit / reload)        │
//! └───────────────┬───────────────────┬───────────────────┬───────┘
//!                 │                   │                   │
//!         ┌───────┴───────┐   ┌───────┴───────┐   ┌───────┴───────┐
//!         │    Session    │   │    Diagram    │   │    Health     │
//!         │  Controller   │   │   Pipeline    │   │   Monitor     │
//!         └───────┬───────┘   └───┬───────┬───┘   └───────┬───────┘
//!                 │ project()     │       │ parse/render  │
//!                 │               │   ┌───┴────────┐      │
//!                 │               │   │  Mermaid   │      │
//!                 │               │   │  renderer  │      │
//!                 │               │   └────────────┘      │
//!         ┌───────┴───────────────┴───────────────────────┴───────┐
//!         │          WorkflowTransport (HttpTransport)            │
//!         │   stream  ·  health  ·  fetch_diagram                 │
//!         └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SessionController`]: single-flight prompt submission and transcript
//! - [`StreamEvent`]: decoded unit of workflow output
//! - [`project`]: the formatting rules from event to transcript line
//! - [`DiagramPipeline`]: fetch, validate and render the workflow diagram
//! - [`HealthMonitor`]: tri-state backend health
//! - [`HttpTransport`]: the HTTP/SSE implementation of [`WorkflowTransport`]
//!
//! # Quick Start
//!
//! ```ignore
//! use maestro_client_core::{ClientConfig, HttpTransport, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::default();
//!     let transport = HttpTransport::from_config(&config)?;
//!     let session = SessionController::new(transport, config.event_buffer);
//!
//!     if let Some(handle) = session.submit("Write a short story about a cat").accepted() {
//!         handle.settled().await;
//!     }
//!
//!     for entry in session.transcript() {
//!         println!("{:?}: {}", entry.role, entry.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # No TUI Dependencies
//!
//! This crate has no dependency on ratatui, crossterm, or any other UI
//! framework.

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod diagram;
pub mod events;
pub mod health;
pub mod projector;
pub mod session;
pub mod transport;

pub use config::{
    default_config_path, load_config, load_config_from_path, ClientConfig, ClientToml,
    ConfigError, ConfigOverrides, ConfigSource,
};
pub use diagram::mermaid::{MermaidDiagram, MermaidRenderer};
pub use diagram::{
    DiagramError, DiagramKind, DiagramPipeline, DiagramRenderer, DiagramState, RenderedDiagram,
};
pub use events::{StreamEvent, WireStreamEvent};
pub use health::{HealthMonitor, HealthStatus};
pub use projector::project;
pub use session::{
    Role, SessionController, SessionState, StreamHandle, StreamOutcome, SubmitOutcome,
    SubmitRejection, TranscriptEntry,
};
pub use transport::{DiagramDescription, HttpTransport, TransportError, WorkflowTransport};
