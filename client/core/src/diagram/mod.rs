//! Workflow Diagram Pipeline
//!
//! Fetches the backend's textual workflow description, validates it with a
//! [`DiagramRenderer`], and mounts the rendered artifact.
//!
//! ```text
//! fetch_diagram() --err--> validation_error = msg, keep mounted artifact
//!       |
//!       v
//! renderer.parse() --err--> validation_error = parser msg, unmount artifact
//!       |
//!       v
//! renderer.render() --ok--> mount artifact, clear error, rendered = true
//! ```
//!
//! Each pass starts from the fetch. A failed stage ends that pass only, and a
//! pass started later supersedes any pass still running. Diagram failures
//! never reach the chat transcript.

pub mod mermaid;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::transport::WorkflowTransport;

/// Diagram validation and rendering errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagramError {
    /// The description does not parse
    #[error("Parse error on line {line}: {reason}")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// The description parsed but could not be drawn
    #[error("Render error: {0}")]
    Render(String),
}

impl DiagramError {
    pub(crate) fn syntax(line: usize, reason: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            reason: reason.into(),
        }
    }
}

/// Which kind of diagram a description declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    /// Participants exchanging messages
    Sequence,
    /// Nodes connected by links
    Flowchart,
}

/// A mounted visual artifact: text lines ready for a terminal panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    /// Declared diagram kind
    pub kind: DiagramKind,
    /// Rendered lines, top to bottom
    pub lines: Vec<String>,
}

/// Validates and renders diagram descriptions
///
/// Parsing and drawing are separate stages so a syntax error can be told
/// apart from a drawing failure; the parsed form is handed to `render`.
pub trait DiagramRenderer: Send + Sync {
    /// Parsed, validated description
    type Parsed: Send;

    /// Check the description's syntax
    ///
    /// # Errors
    ///
    /// Returns [`DiagramError::Syntax`] with the parser's message.
    fn parse(&self, description: &str) -> Result<Self::Parsed, DiagramError>;

    /// Draw a description that passed [`parse`](Self::parse)
    ///
    /// # Errors
    ///
    /// Returns a [`DiagramError`] if the description cannot be drawn.
    fn render(&self, parsed: &Self::Parsed) -> Result<RenderedDiagram, DiagramError>;
}

/// How a pass ended, decided before the shared state is touched
enum PassResult {
    FetchFailed(String),
    Rejected { description: String, error: String },
    RenderFailed { description: String, error: String },
    Rendered { description: String, artifact: RenderedDiagram },
}

/// Result of the latest pipeline pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramState {
    /// Description returned by the last successful fetch
    pub raw_description: Option<String>,
    /// Message from the stage that failed, if any
    pub validation_error: Option<String>,
    /// Whether the last pass mounted an artifact
    pub rendered: bool,
    /// Currently mounted artifact
    pub artifact: Option<RenderedDiagram>,
}

/// Fetch, validate, render
pub struct DiagramPipeline<T: WorkflowTransport, R: DiagramRenderer> {
    transport: Arc<T>,
    renderer: Arc<R>,
    state: Arc<RwLock<DiagramState>>,
    /// Id of the most recently started pass
    latest_pass: Arc<AtomicU64>,
}

impl<T: WorkflowTransport, R: DiagramRenderer> Clone for DiagramPipeline<T, R> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            renderer: Arc::clone(&self.renderer),
            state: Arc::clone(&self.state),
            latest_pass: Arc::clone(&self.latest_pass),
        }
    }
}

impl<T, R> DiagramPipeline<T, R>
where
    T: WorkflowTransport + 'static,
    R: DiagramRenderer + 'static,
{
    /// Create a pipeline with empty state
    pub fn new(transport: Arc<T>, renderer: R) -> Self {
        Self {
            transport,
            renderer: Arc::new(renderer),
            state: Arc::new(RwLock::new(DiagramState::default())),
            latest_pass: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> DiagramState {
        self.state.read().clone()
    }

    /// Run one full pass and return the resulting state
    ///
    /// A pass that has been overtaken by a newer one leaves the state alone.
    pub async fn load(&self) -> DiagramState {
        let pass = self.latest_pass.fetch_add(1, Ordering::SeqCst) + 1;

        let result = match self.transport.fetch_diagram().await {
            Ok(d) => self.validate(d.diagram),
            Err(e) => PassResult::FetchFailed(e.to_string()),
        };

        let mut state = self.state.write();
        if self.latest_pass.load(Ordering::SeqCst) != pass {
            tracing::debug!(pass, "Diagram pass superseded");
            return state.clone();
        }

        match result {
            PassResult::FetchFailed(error) => {
                tracing::warn!(%error, "Diagram fetch failed");
                state.validation_error = Some(error);
                state.rendered = false;
            }
            PassResult::Rejected { description, error } => {
                tracing::warn!(%error, "Diagram description rejected");
                state.raw_description = Some(description);
                state.validation_error = Some(error);
                state.artifact = None;
                state.rendered = false;
            }
            PassResult::RenderFailed { description, error } => {
                tracing::warn!(%error, "Diagram render failed");
                state.raw_description = Some(description);
                state.validation_error = Some(error);
                state.rendered = false;
            }
            PassResult::Rendered {
                description,
                artifact,
            } => {
                tracing::info!(kind = ?artifact.kind, lines = artifact.lines.len(), "Diagram rendered");
                state.raw_description = Some(description);
                state.validation_error = None;
                state.artifact = Some(artifact);
                state.rendered = true;
            }
        }
        state.clone()
    }

    /// Parse and render a fetched description
    fn validate(&self, description: String) -> PassResult {
        let parsed = match self.renderer.parse(&description) {
            Ok(parsed) => parsed,
            Err(e) => {
                return PassResult::Rejected {
                    description,
                    error: e.to_string(),
                }
            }
        };
        match self.renderer.render(&parsed) {
            Ok(artifact) => PassResult::Rendered {
                description,
                artifact,
            },
            Err(e) => PassResult::RenderFailed {
                description,
                error: e.to_string(),
            },
        }
    }

    /// Run a pass in the background
    pub fn spawn_load(&self) -> JoinHandle<DiagramState> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.load().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_message() {
        let err = DiagramError::syntax(3, "unexpected 'end'");
        assert_eq!(err.to_string(), "Parse error on line 3: unexpected 'end'");
    }

    #[test]
    fn test_default_state_is_empty() {
        let state = DiagramState::default();
        assert!(state.raw_description.is_none());
        assert!(state.validation_error.is_none());
        assert!(!state.rendered);
        assert!(state.artifact.is_none());
    }
}
