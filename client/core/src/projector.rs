//! Event-to-Line Projection
//!
//! The formatting rules that turn one [`StreamEvent`] into at most one
//! transcript line. Nothing else in the crate formats step output.

use crate::events::StreamEvent;

/// Project a stream event onto a transcript line
///
/// - errors become `Error: {message}` and always produce a line
/// - named steps become `{step} ({agent}): {result}`, missing parts empty
/// - plain results pass through verbatim; an empty one produces no line
#[must_use]
pub fn project(event: &StreamEvent) -> Option<String> {
    match event {
        StreamEvent::Error(message) => Some(format!("Error: {message}")),
        StreamEvent::NamedStep {
            name,
            agent,
            result,
        } => Some(format!(
            "{name} ({}): {}",
            agent.as_deref().unwrap_or_default(),
            result.as_deref().unwrap_or_default()
        )),
        StreamEvent::PlainResult(result) => result.clone().filter(|r| !r.is_empty()),
    }
}
