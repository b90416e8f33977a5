//! TextBlock Widget
//!
//! A borderless, scrollable region of wrapped text segments, each aligned to
//! the left or right edge. Segments hold styled lines, so Markdown emphasis
//! survives wrapping. Scrolling is measured from the bottom so new content
//! stays in view unless the user has scrolled back.

use std::mem;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::StatefulWidget;
use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::markdown::markdown_lines;

/// Which edge a segment hugs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    /// Flush left
    Left,
    /// Flush right
    Right,
}

/// One block of text (a transcript entry)
#[derive(Clone, Debug)]
pub struct Segment {
    /// Styled lines, before wrapping
    pub lines: Vec<Line<'static>>,
    /// Base style of the segment
    pub style: Style,
    /// Edge to align to
    pub align: Align,
}

impl Segment {
    /// Plain text, one line per `\n`
    pub fn new(text: &str, style: Style, align: Align) -> Self {
        Self {
            lines: text
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), style)))
                .collect(),
            style,
            align,
        }
    }

    /// Markdown text styled on top of `style`
    pub fn markdown(text: &str, style: Style, align: Align) -> Self {
        Self {
            lines: markdown_lines(text, style),
            style,
            align,
        }
    }
}

/// A word with its trailing whitespace, carrying its span style
#[derive(Debug)]
struct StyledWord {
    text: String,
    whitespace: String,
    style: Style,
}

impl Fragment for StyledWord {
    fn width(&self) -> f64 {
        self.text.width() as f64
    }

    fn whitespace_width(&self) -> f64 {
        self.whitespace.width() as f64
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

/// One wrapped row ready to draw
struct Row {
    line: Line<'static>,
    width: usize,
    align: Align,
}

/// Split a line into words; leading indentation stays with the first word
fn words(line: &Line<'_>) -> Vec<StyledWord> {
    let mut words = Vec::new();
    let mut at_start = true;

    for span in &line.spans {
        let mut text = String::new();
        let mut whitespace = String::new();
        for c in span.content.chars() {
            if c.is_whitespace() {
                if at_start {
                    text.push(c);
                } else {
                    whitespace.push(c);
                }
                continue;
            }
            at_start = false;
            if !whitespace.is_empty() {
                words.push(StyledWord {
                    text: mem::take(&mut text),
                    whitespace: mem::take(&mut whitespace),
                    style: span.style,
                });
            }
            text.push(c);
        }
        if !text.is_empty() || !whitespace.is_empty() {
            words.push(StyledWord {
                text,
                whitespace,
                style: span.style,
            });
        }
    }
    words
}

/// Break words wider than `max` into pieces that fit
fn split_long(words: Vec<StyledWord>, max: usize) -> Vec<StyledWord> {
    let mut out = Vec::with_capacity(words.len());
    for word in words {
        if word.text.width() <= max {
            out.push(word);
            continue;
        }
        let mut piece = String::new();
        let mut used = 0;
        for c in word.text.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > max && !piece.is_empty() {
                out.push(StyledWord {
                    text: mem::take(&mut piece),
                    whitespace: String::new(),
                    style: word.style,
                });
                used = 0;
            }
            piece.push(c);
            used += w;
        }
        out.push(StyledWord {
            text: piece,
            whitespace: word.whitespace,
            style: word.style,
        });
    }
    out
}

/// Wrap one styled line to `max` columns
fn wrap_line(line: &Line<'_>, max: usize, align: Align) -> Vec<Row> {
    let words = split_long(words(line), max);
    if words.is_empty() {
        return vec![Row {
            line: Line::default(),
            width: 0,
            align,
        }];
    }

    wrap_first_fit(&words, &[max as f64])
        .into_iter()
        .map(|row| {
            let mut spans = Vec::with_capacity(row.len());
            let mut width = 0;
            for (i, word) in row.iter().enumerate() {
                let mut content = word.text.clone();
                width += word.text.width();
                if i + 1 < row.len() {
                    content.push_str(&word.whitespace);
                    width += word.whitespace.width();
                }
                spans.push(Span::styled(content, word.style));
            }
            Row {
                line: Line::from(spans),
                width,
                align,
            }
        })
        .collect()
}

/// State for a scrollable text block
#[derive(Debug, Default)]
pub struct TextBlockState {
    /// Scroll offset (lines from bottom, 0 = latest)
    pub scroll_offset: usize,
    /// Total wrapped lines at last render
    pub total_lines: usize,
    /// Visible height at last render
    pub viewport: usize,
}

impl TextBlockState {
    /// Scroll by delta (positive = towards older content)
    pub fn scroll(&mut self, delta: i32) {
        let step = usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX);
        self.scroll_offset = if delta >= 0 {
            self.scroll_offset.saturating_add(step)
        } else {
            self.scroll_offset.saturating_sub(step)
        };
        self.clamp();
    }

    /// Jump back to the newest content
    pub fn scroll_to_latest(&mut self) {
        self.scroll_offset = 0;
    }

    fn clamp(&mut self) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport);
        self.scroll_offset = self.scroll_offset.min(max_scroll);
    }
}

/// A borderless, scrollable block of aligned segments
pub struct TextBlock<'a> {
    segments: &'a [Segment],
    placeholder: Option<(&'a str, Style)>,
    /// Widest a wrapped line may be, as a percentage of the area
    max_width_percent: u16,
}

impl<'a> TextBlock<'a> {
    /// Create a block over `segments`
    #[must_use]
    pub fn new(segments: &'a [Segment]) -> Self {
        Self {
            segments,
            placeholder: None,
            max_width_percent: 80,
        }
    }

    /// Text shown when there are no segments
    #[must_use]
    pub fn placeholder(mut self, text: &'a str, style: Style) -> Self {
        self.placeholder = Some((text, style));
        self
    }

    /// Limit line width to a percentage of the area (1..=100)
    #[must_use]
    pub fn max_width_percent(mut self, percent: u16) -> Self {
        self.max_width_percent = percent.clamp(1, 100);
        self
    }

    fn wrapped_rows(&self, width: u16) -> Vec<Row> {
        let wrap_width =
            (usize::from(width) * usize::from(self.max_width_percent) / 100).max(1);
        let mut rows = Vec::new();

        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                rows.push(Row {
                    line: Line::default(),
                    width: 0,
                    align: Align::Left,
                });
            }
            for line in &segment.lines {
                rows.extend(wrap_line(line, wrap_width, segment.align));
            }
        }
        rows
    }
}

impl StatefulWidget for TextBlock<'_> {
    type State = TextBlockState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        if self.segments.is_empty() {
            state.total_lines = 0;
            state.scroll_offset = 0;
            if let Some((text, style)) = self.placeholder {
                buf.set_stringn(area.x, area.y, text, usize::from(area.width), style);
            }
            return;
        }

        let rows = self.wrapped_rows(area.width);
        state.total_lines = rows.len();
        state.viewport = usize::from(area.height);
        state.clamp();

        let visible_end = state.total_lines.saturating_sub(state.scroll_offset);
        let visible_start = visible_end.saturating_sub(state.viewport);

        for (y, row) in rows[visible_start..visible_end].iter().enumerate() {
            let Ok(y) = u16::try_from(y) else { break };
            let width = u16::try_from(row.width).unwrap_or(area.width).min(area.width);
            let x = match row.align {
                Align::Left => area.x,
                Align::Right => area.x + area.width - width,
            };
            buf.set_line(x, area.y + y, &row.line, width);
        }
    }
}
