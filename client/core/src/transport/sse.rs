//! Event Stream Decoding
//!
//! Splits a chunked response body into lines and decodes each payload line
//! into a [`StreamEvent`]. Accepts server-sent events (`data: {json}`) and
//! bare newline-delimited JSON. Each payload line is one event; multi-line
//! `data:` continuation is not used by the workflow backend.

use crate::events::StreamEvent;

/// Sentinel some servers send as the last `data:` line
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental line decoder for streamed workflow output
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    /// Bytes received but not yet terminated by a newline
    buffer: Vec<u8>,
    /// Lines skipped because they were not valid events
    skipped: usize,
}

impl EventStreamDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk, returning every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = self.decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    /// Number of lines skipped as malformed so far
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<StreamEvent> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim_end_matches(['\n', '\r']);

        let payload = payload_of(line)?;
        if payload == DONE_SENTINEL {
            return None;
        }

        match StreamEvent::from_json(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                self.skipped += 1;
                tracing::warn!(error = %e, line = %payload, "Skipping undecodable stream line");
                None
            }
        }
    }
}

/// Extract the JSON payload of a line, or `None` for lines that carry none
fn payload_of(line: &str) -> Option<&str> {
    if line.trim().is_empty() || line.starts_with(':') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("data:") {
        let payload = rest.trim();
        return (!payload.is_empty()).then_some(payload);
    }

    let trimmed = line.trim_start();
    if trimmed.starts_with('{') {
        return Some(trimmed.trim_end());
    }

    // event:, id:, retry: and anything unrecognised
    None
}
