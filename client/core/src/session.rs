//! Session Management
//!
//! Owns the chat transcript and the lifecycle of the one workflow stream a
//! session may have running at a time.
//!
//! # Lifecycle
//!
//! ```text
//!            submit(prompt)                      event
//!   ┌──────┐ non-empty, idle ┌───────────┐ ◄──────────────┐
//!   │ Idle │ ──────────────► │ Streaming │ ───────────────┘
//!   └──────┘                 └───────────┘
//!       ▲     Ok: nothing appended  │
//!       └───────────────────────────┘
//!             Err: "Stream failed: ..."
//! ```
//!
//! A submit while streaming is ignored, not queued. There is no cancel: a
//! stream runs until the backend completes or the transport fails.
//!
//! The stream task is the only writer of assistant entries while a stream is
//! running. The transport and the writer run joined in one task and are
//! connected by a bounded channel, so entries land in exactly the order the
//! backend produced them.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::StreamEvent;
use crate::projector::project;
use crate::transport::{TransportError, WorkflowTransport};

/// Who an entry belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prompt typed by the user
    User,
    /// Output of the workflow
    Assistant,
}

/// One line of the transcript
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Display text
    pub text: String,
    /// Who produced it
    pub role: Role,
    /// Reports a step error or a failed stream rather than workflow output
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl TranscriptEntry {
    /// Create a user entry
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::User,
            failed: false,
        }
    }

    /// Create an assistant entry
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: Role::Assistant,
            failed: false,
        }
    }

    /// Create an assistant entry reporting a failure
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            failed: true,
            ..Self::assistant(text)
        }
    }
}

/// Why a submit did not start a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitRejection {
    /// Prompt was empty or whitespace only
    EmptyPrompt,
    /// Another stream is still running
    Busy,
}

/// How a stream settled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The backend signalled end-of-stream
    Completed {
        /// Events received
        events: usize,
        /// Transcript entries appended for them
        entries: usize,
    },
    /// The transport failed; the message is also in the transcript
    Failed {
        /// Failure text as shown after `Stream failed:`
        message: String,
    },
}

/// Session state snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Text sitting in the input box
    pub pending_prompt: String,
    /// Whether a stream is running
    pub in_flight: bool,
    /// Conversation so far, oldest first
    pub transcript: Vec<TranscriptEntry>,
}

impl SessionState {
    /// Create an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Streaming
    ///
    /// # Errors
    ///
    /// Leaves the state untouched and returns the reason when the prompt is
    /// blank or a stream is already running.
    pub fn begin(&mut self, prompt: &str) -> Result<(), SubmitRejection> {
        if self.in_flight {
            return Err(SubmitRejection::Busy);
        }
        if prompt.trim().is_empty() {
            return Err(SubmitRejection::EmptyPrompt);
        }

        self.transcript.push(TranscriptEntry::user(prompt));
        self.pending_prompt.clear();
        self.in_flight = true;
        Ok(())
    }

    /// Apply one stream event, returning whether an entry was appended
    pub fn record_event(&mut self, event: &StreamEvent) -> bool {
        match project(event) {
            Some(line) => {
                let entry = if event.is_error() {
                    TranscriptEntry::failure(line)
                } else {
                    TranscriptEntry::assistant(line)
                };
                self.transcript.push(entry);
                true
            }
            None => false,
        }
    }

    /// Streaming -> Idle
    ///
    /// A failure appends one `Stream failed: ...` entry; a clean completion
    /// appends nothing.
    pub fn settle(&mut self, result: Result<(), TransportError>) -> Option<String> {
        match result {
            Ok(()) => {
                self.in_flight = false;
                None
            }
            Err(e) => Some(self.fail(e.to_string())),
        }
    }

    /// Streaming -> Idle without a transport result (the stream task died)
    ///
    /// Appends one `Stream failed: ...` entry and returns the message.
    pub fn fail(&mut self, message: impl Into<String>) -> String {
        let message = message.into();
        self.transcript
            .push(TranscriptEntry::failure(format!("Stream failed: {message}")));
        self.in_flight = false;
        message
    }
}

/// Handle to a running stream
///
/// Dropping the handle does not stop the stream.
#[derive(Debug)]
pub struct StreamHandle {
    task: JoinHandle<StreamOutcome>,
}

impl StreamHandle {
    /// Wait until the stream has settled and the session is idle again
    pub async fn settled(self) -> StreamOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => StreamOutcome::Failed {
                message: e.to_string(),
            },
        }
    }

    /// Whether the stream task has finished
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Result of a submit request
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A stream was started
    Accepted(StreamHandle),
    /// Nothing happened
    Ignored(SubmitRejection),
}

impl SubmitOutcome {
    /// The stream handle, if the submit was accepted
    #[must_use]
    pub fn accepted(self) -> Option<StreamHandle> {
        match self {
            Self::Accepted(handle) => Some(handle),
            Self::Ignored(_) => None,
        }
    }

    /// Whether a stream was started
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// Rejection reason, if ignored
    #[must_use]
    pub fn rejection(&self) -> Option<SubmitRejection> {
        match self {
            Self::Accepted(_) => None,
            Self::Ignored(reason) => Some(*reason),
        }
    }
}

/// Single-flight streaming session
pub struct SessionController<T: WorkflowTransport> {
    /// Workflow backend
    transport: Arc<T>,
    /// Shared state; never locked across an await
    state: Arc<Mutex<SessionState>>,
    /// Capacity of the event channel between transport and writer
    event_buffer: usize,
}

impl<T: WorkflowTransport + 'static> SessionController<T> {
    /// Create a controller; `event_buffer` bounds the number of decoded
    /// events queued ahead of the transcript writer
    pub fn new(transport: T, event_buffer: usize) -> Self {
        Self::with_shared_transport(Arc::new(transport), event_buffer)
    }

    /// Create a controller around a transport shared with other components
    pub fn with_shared_transport(transport: Arc<T>, event_buffer: usize) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(SessionState::new())),
            event_buffer: event_buffer.max(1),
        }
    }

    /// Copy of the full state
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Copy of the transcript
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.state.lock().transcript.clone()
    }

    /// Number of transcript entries
    #[must_use]
    pub fn transcript_len(&self) -> usize {
        self.state.lock().transcript.len()
    }

    /// Whether a stream is running
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Current input text
    #[must_use]
    pub fn pending_prompt(&self) -> String {
        self.state.lock().pending_prompt.clone()
    }

    /// Replace the input text
    pub fn set_pending_prompt(&self, text: impl Into<String>) {
        self.state.lock().pending_prompt = text.into();
    }

    /// Edit the input text in place
    pub fn edit_pending_prompt(&self, edit: impl FnOnce(&mut String)) {
        edit(&mut self.state.lock().pending_prompt);
    }

    /// Submit the current input text
    pub fn submit_pending(&self) -> SubmitOutcome {
        let prompt = self.pending_prompt();
        self.submit(&prompt)
    }

    /// Submit a prompt
    ///
    /// Ignored when the prompt is blank or a stream is already running.
    /// Otherwise the user entry is appended before this returns and the
    /// stream runs on a spawned task, so this must be called from within a
    /// tokio runtime.
    pub fn submit(&self, prompt: &str) -> SubmitOutcome {
        if let Err(reason) = self.state.lock().begin(prompt) {
            tracing::debug!(?reason, "Submit ignored");
            return SubmitOutcome::Ignored(reason);
        }

        tracing::info!(
            transport = self.transport.name(),
            prompt_len = prompt.len(),
            "Workflow stream started"
        );

        let task = tokio::spawn(run_stream(
            Arc::clone(&self.transport),
            Arc::clone(&self.state),
            prompt.to_string(),
            self.event_buffer,
        ));

        SubmitOutcome::Accepted(StreamHandle { task })
    }
}

/// Drive one stream to completion, then settle the session
///
/// The pump runs on its own task so a panic in the transport or the writer
/// still settles the session instead of leaving it busy.
async fn run_stream<T: WorkflowTransport + 'static>(
    transport: Arc<T>,
    state: Arc<Mutex<SessionState>>,
    prompt: String,
    buffer: usize,
) -> StreamOutcome {
    let started = Instant::now();
    let pump = tokio::spawn(pump_events(transport, Arc::clone(&state), prompt, buffer));

    let joined = pump.await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let (result, events, entries) = match joined {
        Ok(pumped) => pumped,
        Err(e) => {
            let message = if e.is_panic() {
                "stream task panicked".to_string()
            } else {
                e.to_string()
            };
            tracing::error!(error = %e, elapsed_ms, "Workflow stream task died");
            let message = state.lock().fail(message);
            return StreamOutcome::Failed { message };
        }
    };

    let failure = state.lock().settle(result);
    match failure {
        None => {
            tracing::info!(events, entries, elapsed_ms, "Workflow stream completed");
            StreamOutcome::Completed { events, entries }
        }
        Some(message) => {
            tracing::warn!(events, entries, elapsed_ms, error = %message, "Workflow stream failed");
            StreamOutcome::Failed { message }
        }
    }
}

/// Run the transport and the transcript writer joined, returning the
/// transport result with the event and entry counts
async fn pump_events<T: WorkflowTransport>(
    transport: Arc<T>,
    state: Arc<Mutex<SessionState>>,
    prompt: String,
    buffer: usize,
) -> (Result<(), TransportError>, usize, usize) {
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(buffer);

    let writer = async {
        let mut events = 0usize;
        let mut entries = 0usize;
        while let Some(event) = rx.recv().await {
            events += 1;
            if event.is_error() {
                tracing::warn!(?event, "Workflow reported a step error");
            }
            if state.lock().record_event(&event) {
                entries += 1;
            }
        }
        (events, entries)
    };

    // The sink moves into the transport and is dropped when it returns,
    // which ends the writer loop after the last queued event.
    let (result, (events, entries)) = tokio::join!(transport.stream(&prompt, tx), writer);
    (result, events, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_begin_appends_user_entry_and_clears_input() {
        let mut state = SessionState::new();
        state.pending_prompt = "hello".to_string();

        assert_eq!(state.begin("hello"), Ok(()));
        assert!(state.in_flight);
        assert!(state.pending_prompt.is_empty());
        assert_eq!(state.transcript, vec![TranscriptEntry::user("hello")]);
    }

    #[test]
    fn test_begin_keeps_prompt_verbatim() {
        let mut state = SessionState::new();
        state.begin("  padded prompt \n").unwrap();
        assert_eq!(state.transcript[0].text, "  padded prompt \n");
    }

    #[test]
    fn test_begin_rejects_blank_prompt() {
        let mut state = SessionState::new();
        state.pending_prompt = "   ".to_string();

        assert_eq!(state.begin("   "), Err(SubmitRejection::EmptyPrompt));
        assert_eq!(state.begin(""), Err(SubmitRejection::EmptyPrompt));
        assert!(!state.in_flight);
        assert!(state.transcript.is_empty());
        assert_eq!(state.pending_prompt, "   ");
    }

    #[test]
    fn test_begin_rejects_while_in_flight() {
        let mut state = SessionState::new();
        state.begin("first").unwrap();
        state.pending_prompt = "second".to_string();
        let before = state.clone();

        assert_eq!(state.begin("second"), Err(SubmitRejection::Busy));
        assert_eq!(state, before);
    }

    #[test]
    fn test_record_event_drops_empty_projection() {
        let mut state = SessionState::new();
        state.begin("x").unwrap();

        assert!(!state.record_event(&StreamEvent::PlainResult(None)));
        assert!(state.record_event(&StreamEvent::plain("hi")));
        assert_eq!(state.transcript.len(), 2);
        assert_eq!(state.transcript[1], TranscriptEntry::assistant("hi"));
    }

    #[test]
    fn test_settle_success_appends_nothing() {
        let mut state = SessionState::new();
        state.begin("x").unwrap();

        assert_eq!(state.settle(Ok(())), None);
        assert!(!state.in_flight);
        assert_eq!(state.transcript.len(), 1);
    }

    #[test]
    fn test_settle_failure_appends_entry() {
        let mut state = SessionState::new();
        state.begin("x").unwrap();

        let failure = state.settle(Err(TransportError::Connect("timeout".to_string())));
        assert_eq!(failure.as_deref(), Some("timeout"));
        assert!(!state.in_flight);
        assert_eq!(
            state.transcript.last(),
            Some(&TranscriptEntry::failure("Stream failed: timeout"))
        );
    }

    #[test]
    fn test_fail_settles_without_transport_result() {
        let mut state = SessionState::new();
        state.begin("x").unwrap();

        assert_eq!(state.fail("stream task panicked"), "stream task panicked");
        assert!(!state.in_flight);
        assert_eq!(
            state.transcript.last(),
            Some(&TranscriptEntry::failure("Stream failed: stream task panicked"))
        );
        assert_eq!(state.begin("retry"), Ok(()));
    }

    #[test]
    fn test_step_error_entry_is_marked_failed() {
        let mut state = SessionState::new();
        state.begin("x").unwrap();

        state.record_event(&StreamEvent::error("tool crashed"));
        state.record_event(&StreamEvent::plain("Error: is just text here"));

        assert!(state.transcript[1].failed);
        assert_eq!(state.transcript[1].text, "Error: tool crashed");
        assert!(!state.transcript[2].failed);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&TranscriptEntry::user("hi")).unwrap();
        assert_eq!(json, r#"{"text":"hi","role":"user"}"#);
    }
}
