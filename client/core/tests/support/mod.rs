//! Shared test fixtures: a scripted in-memory transport and a loopback HTTP
//! responder for exercising `HttpTransport` against real sockets.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use maestro_client_core::{DiagramDescription, StreamEvent, TransportError, WorkflowTransport};

// ============================================================================
// Scripted Transport
// ============================================================================

/// Transport that replays a fixed script
///
/// Every `stream()` call sends `events` then, if a gate is set, waits for it
/// before returning `stream_result`.
#[derive(Default)]
pub struct ScriptedTransport {
    pub events: Mutex<Vec<StreamEvent>>,
    pub stream_failure: Mutex<Option<String>>,
    pub gate: Option<Arc<Notify>>,
    pub health_result: Mutex<Option<Result<String, String>>>,
    pub diagrams: Mutex<VecDeque<Result<String, String>>>,
    /// Held by the next `fetch_diagram()` only, after it has taken its result
    pub diagram_gate: Mutex<Option<Arc<Notify>>>,
    /// Panic after sending the scripted events
    pub panic_in_stream: bool,
    pub stream_calls: AtomicUsize,
    pub health_calls: AtomicUsize,
    pub diagram_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(self, events: Vec<StreamEvent>) -> Self {
        *self.events.lock() = events;
        self
    }

    pub fn failing_with(self, message: &str) -> Self {
        *self.stream_failure.lock() = Some(message.to_string());
        self
    }

    /// Hold every stream open until the returned notifier fires
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Hold the next diagram fetch until the returned notifier fires
    pub fn gate_next_diagram(self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        *self.diagram_gate.lock() = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Panic inside `stream()` once the scripted events are sent
    pub fn panicking(mut self) -> Self {
        self.panic_in_stream = true;
        self
    }

    pub fn healthy(self, status: &str) -> Self {
        *self.health_result.lock() = Some(Ok(status.to_string()));
        self
    }

    pub fn unhealthy(self, message: &str) -> Self {
        *self.health_result.lock() = Some(Err(message.to_string()));
        self
    }

    /// Queue diagram fetch results, served in order (the last one repeats)
    pub fn with_diagrams(self, results: Vec<Result<&str, &str>>) -> Self {
        *self.diagrams.lock() = results
            .into_iter()
            .map(|r| r.map(String::from).map_err(String::from))
            .collect();
        self
    }

    pub fn stream_count(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn health_count(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn stream(
        &self,
        prompt: &str,
        sink: mpsc::Sender<StreamEvent>,
    ) -> Result<(), TransportError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        let events = self.events.lock().clone();
        for event in events {
            if sink.send(event).await.is_err() {
                return Ok(());
            }
        }

        assert!(!self.panic_in_stream, "scripted transport panic");

        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }

        match self.stream_failure.lock().clone() {
            Some(message) => Err(TransportError::Connect(message)),
            None => Ok(()),
        }
    }

    async fn health(&self) -> Result<String, TransportError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        match self.health_result.lock().clone() {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(TransportError::Connect(message)),
            None => Err(TransportError::Connect("connection refused".to_string())),
        }
    }

    async fn fetch_diagram(&self) -> Result<DiagramDescription, TransportError> {
        self.diagram_calls.fetch_add(1, Ordering::SeqCst);
        let next = {
            let mut queue = self.diagrams.lock();
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        let gate = self.diagram_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match next {
            Some(Ok(text)) => Ok(DiagramDescription::new(text)),
            Some(Err(message)) => Err(TransportError::Connect(message)),
            None => Err(TransportError::Status {
                status: 404,
                body: "no diagram".to_string(),
            }),
        }
    }
}

// ============================================================================
// Loopback HTTP Responder
// ============================================================================

/// One request as seen by the responder
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Raw header block, lowercased
    pub headers: String,
    pub body: String,
}

/// Serves one canned raw response per accepted connection, in order
pub struct Responder {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl Responder {
    pub async fn start(responses: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                recorded.lock().push(request);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    RecordedRequest {
        method: request_line.next().unwrap_or_default().to_string(),
        path: request_line.next().unwrap_or_default().to_string(),
        headers: head.to_lowercase(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    }
}

/// Complete response with a `Content-Length` body
pub fn response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

pub fn json_response(body: &str) -> String {
    response("200 OK", "application/json", body)
}

/// Server-sent event stream, one `data:` line per payload
pub fn sse_response(payloads: &[&str]) -> String {
    let body: String = payloads
        .iter()
        .map(|p| format!("data: {p}\n\n"))
        .collect();
    response("200 OK", "text/event-stream", &body)
}

/// Chunked event stream that is cut off after its first chunk
pub fn truncated_sse_response(first_payload: &str) -> String {
    let chunk = format!("data: {first_payload}\n\n");
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n{chunk}\r\n",
        chunk.len()
    )
}

/// Address nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
