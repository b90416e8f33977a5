//! Stream Events
//!
//! Decoded units of incremental output from a workflow execution.
//!
//! The backend pushes loosely shaped JSON records: a step result carries
//! `step_name`, `agent_name` and `step_result`, a failed step carries `error`,
//! and the closing record only has bookkeeping flags. [`WireStreamEvent`]
//! mirrors that shape exactly; [`StreamEvent`] is what the rest of the crate
//! consumes, resolved once at decode time so no consumer re-inspects the raw
//! fields.

use serde::{Deserialize, Serialize};

/// Raw event record as it appears on the wire
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireStreamEvent {
    /// Workflow step that produced this output
    pub step_name: Option<String>,
    /// Agent that ran the step
    pub agent_name: Option<String>,
    /// Step output (usually a string, occasionally structured)
    pub step_result: Option<serde_json::Value>,
    /// Application-level error raised by the workflow
    pub error: Option<String>,
    /// Whether the step finished (bookkeeping, not displayed)
    pub step_complete: Option<bool>,
    /// Whether the whole workflow finished (bookkeeping, not displayed)
    pub workflow_complete: Option<bool>,
}

/// A decoded stream event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// The workflow reported an error for this unit
    Error(String),
    /// Output of a named workflow step
    NamedStep {
        /// Step name
        name: String,
        /// Agent that ran the step, if reported
        agent: Option<String>,
        /// Step output, if any
        result: Option<String>,
    },
    /// Output not attributed to a step
    PlainResult(Option<String>),
}

impl StreamEvent {
    /// Build an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Build a named step event
    pub fn step(
        name: impl Into<String>,
        agent: Option<impl Into<String>>,
        result: Option<impl Into<String>>,
    ) -> Self {
        Self::NamedStep {
            name: name.into(),
            agent: agent.map(Into::into),
            result: result.map(Into::into),
        }
    }

    /// Build a plain result event
    pub fn plain(result: impl Into<String>) -> Self {
        Self::PlainResult(Some(result.into()))
    }

    /// Decode one JSON record
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the text is not a JSON object of
    /// the expected shape.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<WireStreamEvent>(text).map(Self::from)
    }

    /// Whether this event reports an application-level error
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<WireStreamEvent> for StreamEvent {
    /// An `error` wins over every other field; a `step_name` makes the event
    /// a named step; everything else is a plain result. Empty strings count
    /// as absent.
    fn from(wire: WireStreamEvent) -> Self {
        if let Some(error) = non_empty(wire.error) {
            return Self::Error(error);
        }

        let result = wire.step_result.and_then(value_text);

        match non_empty(wire.step_name) {
            Some(name) => Self::NamedStep {
                name,
                agent: non_empty(wire.agent_name),
                result,
            },
            None => Self::PlainResult(result),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Text form of a step result; strings verbatim, other JSON as JSON text
fn value_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => non_empty(Some(s)),
        other => Some(other.to_string()),
    }
}
