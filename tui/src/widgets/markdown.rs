//! Markdown Styling
//!
//! Turns the Markdown that workflow steps produce into styled ratatui lines.
//! Inline emphasis becomes modifiers on top of the entry's base style;
//! block structure (paragraphs, headings, lists, code blocks) becomes line
//! breaks, list markers and blank separator lines. Wrapping is left to
//! [`TextBlock`](super::TextBlock).

use std::mem;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::theme::{CODE_AMBER, DIM_GRAY};

const RULE: &str = "────────";

/// Styled lines for a Markdown text
pub fn markdown_lines(text: &str, base: Style) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::new(base);
    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        builder.event(event);
    }
    builder.finish()
}

struct LineBuilder {
    base: Style,
    /// One entry per open tag
    styles: Vec<Style>,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    /// Next number for each open list, `None` for bullets
    lists: Vec<Option<u64>>,
    in_code_block: bool,
}

impl LineBuilder {
    fn new(base: Style) -> Self {
        Self {
            base,
            styles: Vec::new(),
            lines: Vec::new(),
            current: Vec::new(),
            lists: Vec::new(),
            in_code_block: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        self.styles.push(self.style().add_modifier(modifier));
    }

    /// Close the current line if it has content
    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.end_line();
        }
    }

    /// Close the current line, even if empty
    fn end_line(&mut self) {
        self.lines.push(Line::from(mem::take(&mut self.current)));
    }

    /// Blank line between top-level blocks
    fn block_gap(&mut self) {
        self.flush();
        let after_content = self.lines.last().is_some_and(|l| l.width() > 0);
        if self.lists.is_empty() && after_content {
            self.lines.push(Line::default());
        }
    }

    fn text(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.current.push(Span::styled(text.to_string(), style));
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => {
                let style = self.style();
                let mut pieces = text.split('\n').peekable();
                while let Some(piece) = pieces.next() {
                    self.text(piece, style);
                    if pieces.peek().is_some() {
                        self.end_line();
                    }
                }
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.text(&text, self.style());
            }
            Event::Code(code) => self.text(&code, self.style().fg(CODE_AMBER)),
            Event::SoftBreak => self.text(" ", self.style()),
            Event::HardBreak => self.end_line(),
            Event::Rule => {
                self.block_gap();
                self.lines
                    .push(Line::styled(RULE, Style::default().fg(DIM_GRAY)));
            }
            Event::TaskListMarker(done) => {
                self.text(if done { "[x] " } else { "[ ] " }, self.style());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.block_gap();
                }
                self.styles.push(self.style());
            }
            Tag::Heading { .. } => {
                self.block_gap();
                self.push_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            Tag::CodeBlock(_) => {
                self.block_gap();
                self.in_code_block = true;
                self.styles.push(self.style().fg(CODE_AMBER));
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_gap();
                } else {
                    self.flush();
                }
                self.lists.push(start);
                self.styles.push(self.style());
            }
            Tag::Item => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                self.text(&format!("{indent}{marker}"), self.style());
                self.styles.push(self.style());
            }
            Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
            Tag::Strong => self.push_modifier(Modifier::BOLD),
            Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
            Tag::Link { .. } => self.push_modifier(Modifier::UNDERLINED),
            _ => self.styles.push(self.style()),
        }
    }

    fn end(&mut self, tag: TagEnd) {
        self.styles.pop();
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item => self.flush(),
            TagEnd::CodeBlock => {
                self.flush();
                self.in_code_block = false;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}
