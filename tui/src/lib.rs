//! Maestro TUI - Terminal chat client for Maestro workflows
//!
//! A full-screen terminal surface over `maestro-client-core`: a chat
//! transcript fed by the streaming session controller, a health indicator,
//! and a collapsible panel showing the workflow diagram.
//!
//! # Architecture
//!
//! - **App**: event loop and key bindings; owns the core components
//! - **UI**: stateless frame layout over core snapshots
//! - **Widgets**: borderless scrollable text blocks
//! - **CLI**: command-line flags layered over the client config

pub mod app;
pub mod cli;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::App;
pub use cli::Args;
