//! Frame Layout and Rendering
//!
//! ```text
//! +------------------------------------------------------------+
//! | Maestro Workflow Chat                      Health: healthy |
//! +-------------------------------+----------------------------+
//! | Conversation                  | Workflow Diagram (F2)      |
//! | user text                     |                            |
//! |                assistant text |                            |
//! +-------------------------------+----------------------------+
//! | Message                                                    |
//! +------------------------------------------------------------+
//!  Enter send | F2 diagram | F5 reload | F6 health | Esc quit
//! ```

use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

use maestro_client_core::{DiagramState, HealthStatus, Role, TranscriptEntry, WorkflowTransport};

use crate::app::App;
use crate::theme::{
    ACCENT_MAGENTA, ASSISTANT_CYAN, DIAGRAM_BLUE, DIM_GRAY, ERROR_RED, PENDING_YELLOW,
    SUCCESS_GREEN, USER_GREEN,
};
use crate::widgets::{Align, Segment, TextBlock};

/// Shown in an empty transcript
pub const PLACEHOLDER: &str = "Start a conversation...";

/// Shown in the input box while a stream runs
pub const STREAMING_HINT: &str = "streaming...";

const TITLE: &str = "Maestro Workflow Chat";

const KEY_HINTS: &str =
    " Enter send | F2 diagram | F5 reload diagram | F6 health | PgUp/PgDn scroll | Esc quit";

/// Draw the whole frame
pub fn draw<T: WorkflowTransport + 'static>(frame: &mut Frame, app: &mut App<T>) {
    let [header, body, input, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, header, &app.health_status());

    if app.show_diagram {
        let [conversation, diagram] =
            Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
                .areas(body);
        draw_transcript(frame, conversation, app);
        draw_diagram(frame, diagram, &app.diagram_state());
    } else {
        draw_transcript(frame, body, app);
    }

    draw_input(frame, input, app);
    draw_footer(frame, footer, app.transcript_view.scroll_offset);
}

fn draw_header(frame: &mut Frame, area: Rect, health: &HealthStatus) {
    let health_color = match health {
        HealthStatus::Healthy(_) => SUCCESS_GREEN,
        HealthStatus::Unknown => PENDING_YELLOW,
        HealthStatus::Unreachable => ERROR_RED,
    };

    let title = Paragraph::new(Span::styled(
        format!(" {TITLE}"),
        Style::default()
            .fg(ACCENT_MAGENTA)
            .add_modifier(Modifier::BOLD),
    ));
    let status = Paragraph::new(Line::from(vec![
        Span::styled("Health: ", Style::default().fg(DIM_GRAY)),
        Span::styled(format!("{health} "), Style::default().fg(health_color)),
    ]))
    .alignment(Alignment::Right);

    frame.render_widget(title, area);
    frame.render_widget(status, area);
}

/// Transcript entries as aligned, styled segments
///
/// Messages are Markdown; failure reports are shown verbatim in red.
pub fn transcript_segments(entries: &[TranscriptEntry]) -> Vec<Segment> {
    entries
        .iter()
        .map(|entry| match entry.role {
            Role::User => {
                Segment::markdown(&entry.text, Style::default().fg(USER_GREEN), Align::Left)
            }
            Role::Assistant if entry.failed => {
                Segment::new(&entry.text, Style::default().fg(ERROR_RED), Align::Right)
            }
            Role::Assistant => {
                Segment::markdown(&entry.text, Style::default().fg(ASSISTANT_CYAN), Align::Right)
            }
        })
        .collect()
}

fn draw_transcript<T: WorkflowTransport + 'static>(frame: &mut Frame, area: Rect, app: &mut App<T>) {
    let block = Block::bordered()
        .title(" Conversation ")
        .border_style(Style::default().fg(DIM_GRAY));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let segments = transcript_segments(&app.session.transcript());
    let text = TextBlock::new(&segments)
        .placeholder(PLACEHOLDER, Style::default().fg(DIM_GRAY))
        .max_width_percent(80);
    frame.render_stateful_widget(text, inner, &mut app.transcript_view);
}

/// Diagram panel lines for a pipeline state
pub fn diagram_lines(state: &DiagramState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(ref error) = state.validation_error {
        lines.push(Line::styled(
            format!("Diagram error: {error}"),
            Style::default().fg(ERROR_RED),
        ));
    }

    match state.artifact {
        Some(ref artifact) => {
            if !lines.is_empty() {
                lines.push(Line::default());
            }
            lines.extend(
                artifact
                    .lines
                    .iter()
                    .map(|l| Line::styled(l.clone(), Style::default().fg(DIAGRAM_BLUE))),
            );
        }
        None if lines.is_empty() => {
            lines.push(Line::styled(
                "Loading diagram...",
                Style::default().fg(DIM_GRAY),
            ));
        }
        None => {}
    }
    lines
}

fn draw_diagram(frame: &mut Frame, area: Rect, state: &DiagramState) {
    let block = Block::bordered()
        .title(" Workflow Diagram ")
        .title_style(Style::default().fg(ACCENT_MAGENTA))
        .border_style(Style::default().fg(DIM_GRAY));
    frame.render_widget(Paragraph::new(diagram_lines(state)).block(block), area);
}

/// Trailing part of `text` that fits in `width` columns
fn tail_fit(text: &str, width: usize) -> &str {
    let mut used = 0;
    let mut start = text.len();
    for (i, c) in text.char_indices().rev() {
        used += c.width().unwrap_or(0);
        if used > width {
            break;
        }
        start = i;
    }
    &text[start..]
}

fn draw_input<T: WorkflowTransport + 'static>(frame: &mut Frame, area: Rect, app: &App<T>) {
    let block = Block::bordered()
        .title(" Message ")
        .border_style(Style::default().fg(DIM_GRAY));
    let width = usize::from(block.inner(area).width);

    let line = if app.session.is_in_flight() {
        Line::styled(
            STREAMING_HINT,
            Style::default()
                .fg(PENDING_YELLOW)
                .add_modifier(Modifier::ITALIC),
        )
    } else {
        let text = format!("{}_", app.session.pending_prompt());
        Line::styled(
            tail_fit(&text, width).to_string(),
            Style::default().fg(USER_GREEN),
        )
    };

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_footer(frame: &mut Frame, area: Rect, scroll_offset: usize) {
    let mut hints = String::from(KEY_HINTS);
    if scroll_offset > 0 {
        hints.push_str(&format!(" [^{scroll_offset} lines]"));
    }
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(DIM_GRAY)),
        area,
    );
}
