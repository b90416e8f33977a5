//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, redraw tick)
//! - `SessionController` for the chat transcript and single-flight streaming
//! - `HealthMonitor` and `DiagramPipeline` running beside the chat
//!
//! All network work happens on spawned tasks owned by the core; the loop only
//! reads snapshots and redraws on a fixed tick.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::event::{MouseEvent, MouseEventKind};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::Terminal;
use tokio::task::JoinHandle;

use maestro_client_core::{
    ClientConfig, DiagramPipeline, DiagramState, HealthMonitor, HealthStatus, MermaidRenderer,
    SessionController, WorkflowTransport,
};

use crate::ui;
use crate::widgets::TextBlockState;

/// Redraw interval; streamed entries show up within one tick
const TICK: Duration = Duration::from_millis(100);

/// Lines moved per mouse wheel step
const WHEEL_STEP: i32 = 3;

/// Main application state
pub struct App<T: WorkflowTransport + 'static> {
    // === Core State ===
    /// Is the app still running?
    pub(crate) running: bool,

    // === Client Core ===
    /// Chat transcript and stream lifecycle
    pub(crate) session: SessionController<T>,
    /// Backend health
    pub(crate) health: HealthMonitor<T>,
    /// Workflow diagram
    pub(crate) diagram: DiagramPipeline<T, MermaidRenderer>,
    /// Polling interval, `None` for a single probe at startup
    health_poll: Option<Duration>,
    /// Background health poller
    poller: Option<JoinHandle<()>>,

    // === View State ===
    /// Diagram panel expanded
    pub(crate) show_diagram: bool,
    /// Transcript scroll position
    pub(crate) transcript_view: TextBlockState,
}

impl<T: WorkflowTransport + 'static> App<T> {
    /// Create an App around a shared transport
    pub fn new(transport: Arc<T>, config: &ClientConfig) -> Self {
        Self {
            running: true,
            session: SessionController::with_shared_transport(
                Arc::clone(&transport),
                config.event_buffer,
            ),
            health: HealthMonitor::new(Arc::clone(&transport)),
            diagram: DiagramPipeline::new(transport, MermaidRenderer::new()),
            health_poll: config.health_poll_interval(),
            poller: None,
            show_diagram: false,
            transcript_view: TextBlockState::default(),
        }
    }

    /// Kick off the startup health probe and diagram load
    pub fn start(&mut self) {
        match self.health_poll {
            Some(interval) => self.poller = Some(self.health.spawn_polling(interval)),
            None => {
                self.health.spawn_check();
            }
        }
        self.diagram.spawn_load();
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut ticker = tokio::time::interval(TICK);

        self.start();

        while self.running {
            terminal.draw(|frame| ui::draw(frame, self))?;

            tokio::select! {
                biased;

                maybe_event = event_stream.next() => {
                    match maybe_event {
                        // Only handle Press events (not Release or Repeat)
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.handle_key(key);
                        }
                        Some(Ok(Event::Mouse(mouse))) => self.handle_mouse(mouse),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Terminal event error");
                        }
                        None => self.running = false,
                    }
                }

                _ = ticker.tick() => {}
            }
        }

        Ok(())
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            // Quit
            KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false;
            }

            // Panels
            KeyCode::F(2) => self.show_diagram = !self.show_diagram,
            KeyCode::F(5) => {
                tracing::debug!("Diagram reload requested");
                self.diagram.spawn_load();
            }
            KeyCode::F(6) => {
                self.health.spawn_check();
            }

            // Submit message
            KeyCode::Enter => {
                if self.session.submit_pending().is_accepted() {
                    self.transcript_view.scroll_to_latest();
                }
            }

            // Typing (input is disabled while a stream runs)
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if !self.session.is_in_flight() {
                    self.session.edit_pending_prompt(|p| p.push(c));
                }
            }
            KeyCode::Backspace => {
                if !self.session.is_in_flight() {
                    self.session.edit_pending_prompt(|p| {
                        p.pop();
                    });
                }
            }

            // Conversation scrolling
            KeyCode::PageUp => self.transcript_view.scroll(self.page_size()),
            KeyCode::PageDown => self.transcript_view.scroll(-self.page_size()),
            KeyCode::Up => self.transcript_view.scroll(1),
            KeyCode::Down => self.transcript_view.scroll(-1),
            KeyCode::End => self.transcript_view.scroll_to_latest(),

            _ => {}
        }
    }

    /// Handle mouse input
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.transcript_view.scroll(WHEEL_STEP),
            MouseEventKind::ScrollDown => self.transcript_view.scroll(-WHEEL_STEP),
            _ => {}
        }
    }

    fn page_size(&self) -> i32 {
        let half = self.transcript_view.viewport / 2;
        i32::try_from(half).unwrap_or(i32::MAX).max(1)
    }

    /// Is the app still running?
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The chat session
    #[must_use]
    pub fn session(&self) -> &SessionController<T> {
        &self.session
    }

    /// The health monitor
    #[must_use]
    pub fn health(&self) -> &HealthMonitor<T> {
        &self.health
    }

    /// Latest health status
    #[must_use]
    pub fn health_status(&self) -> HealthStatus {
        self.health.status()
    }

    /// The diagram pipeline
    #[must_use]
    pub fn diagram(&self) -> &DiagramPipeline<T, MermaidRenderer> {
        &self.diagram
    }

    /// Latest diagram state
    #[must_use]
    pub fn diagram_state(&self) -> DiagramState {
        self.diagram.state()
    }

    /// Whether the diagram panel is expanded
    #[must_use]
    pub fn show_diagram(&self) -> bool {
        self.show_diagram
    }
}

impl<T: WorkflowTransport + 'static> Drop for App<T> {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}
