//! Mermaid Diagram Support
//!
//! Parses the two Mermaid shapes the workflow server emits and draws them as
//! plain text lines:
//!
//! - `sequenceDiagram`: participants, messages, notes and nested blocks
//!   (`loop`, `alt`/`else`, `par`/`and`, ...)
//! - `flowchart` / `graph` with a direction (`TD`, `TB`, `BT`, `LR`, `RL`):
//!   nodes with shapes, links with optional labels, `subgraph` groups
//!
//! Styling statements (`classDef`, `style`, `click`, ...) are accepted and
//! ignored. Anything else the parser does not understand is a syntax error
//! carrying its 1-based line number.

use super::{DiagramError, DiagramKind, DiagramRenderer, RenderedDiagram};

/// Text renderer for Mermaid descriptions
#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidRenderer;

impl MermaidRenderer {
    /// Create a renderer
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// A Mermaid description that passed the parser
#[derive(Debug)]
pub struct MermaidDiagram(Diagram);

impl DiagramRenderer for MermaidRenderer {
    type Parsed = MermaidDiagram;

    fn parse(&self, description: &str) -> Result<MermaidDiagram, DiagramError> {
        parse(description).map(MermaidDiagram)
    }

    fn render(&self, parsed: &MermaidDiagram) -> Result<RenderedDiagram, DiagramError> {
        Ok(match parsed.0 {
            Diagram::Sequence(ref diagram) => RenderedDiagram {
                kind: DiagramKind::Sequence,
                lines: diagram.render(),
            },
            Diagram::Flowchart(ref chart) => RenderedDiagram {
                kind: DiagramKind::Flowchart,
                lines: chart.render(),
            },
        })
    }
}

// =============================================================================
// Syntax Tree
// =============================================================================

#[derive(Debug)]
enum Diagram {
    Sequence(SequenceDiagram),
    Flowchart(Flowchart),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

impl Direction {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopDown),
            "BT" => Some(Self::BottomUp),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::TopDown => "top to bottom",
            Self::BottomUp => "bottom to top",
            Self::LeftRight => "left to right",
            Self::RightLeft => "right to left",
        }
    }
}

#[derive(Debug, Default)]
struct SequenceDiagram {
    title: Option<String>,
    autonumber: bool,
    /// (id, display label) in declaration order
    participants: Vec<(String, String)>,
    items: Vec<SequenceItem>,
}

#[derive(Debug)]
enum SequenceItem {
    Message {
        from: String,
        to: String,
        arrow: &'static str,
        text: String,
    },
    Note {
        placement: String,
        text: String,
    },
    BlockStart {
        keyword: String,
        label: String,
    },
    BlockBranch {
        keyword: String,
        label: String,
    },
    BlockEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkStyle {
    Arrow,
    Open,
    Dotted,
    Thick,
}

impl LinkStyle {
    fn token(self) -> &'static str {
        match self {
            Self::Arrow => "-->",
            Self::Open => "---",
            Self::Dotted => "-.->",
            Self::Thick => "==>",
        }
    }
}

#[derive(Debug)]
struct Edge {
    from: String,
    to: String,
    style: LinkStyle,
    label: Option<String>,
}

#[derive(Debug)]
struct Flowchart {
    direction: Direction,
    /// (id, display label) in first-seen order
    nodes: Vec<(String, String)>,
    edges: Vec<Edge>,
    subgraphs: Vec<String>,
}

// =============================================================================
// Entry Point
// =============================================================================

/// Non-blank, non-comment lines with their 1-based line numbers
fn statements(text: &str) -> Vec<(usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with("%%"))
        .collect()
}

fn parse(text: &str) -> Result<Diagram, DiagramError> {
    let mut lines = statements(text);

    // YAML front matter (`---` ... `---`) carries display config only
    if lines.first().is_some_and(|(_, l)| *l == "---") {
        let close = lines
            .iter()
            .skip(1)
            .position(|(_, l)| *l == "---")
            .ok_or_else(|| DiagramError::syntax(lines[0].0, "front matter is never closed"))?;
        lines.drain(..close + 2);
    }

    let Some(&(line_no, header)) = lines.first() else {
        return Err(DiagramError::syntax(1, "empty diagram description"));
    };
    let body = &lines[1..];

    let mut words = header.trim_end_matches(';').split_whitespace();
    match words.next() {
        Some("sequenceDiagram") => {
            if let Some(extra) = words.next() {
                return Err(DiagramError::syntax(
                    line_no,
                    format!("unexpected '{extra}' after sequenceDiagram"),
                ));
            }
            parse_sequence(body).map(Diagram::Sequence)
        }
        Some("flowchart" | "graph") => {
            let direction = match words.next() {
                None => Direction::TopDown,
                Some(token) => Direction::parse(token).ok_or_else(|| {
                    DiagramError::syntax(line_no, format!("unknown direction '{token}'"))
                })?,
            };
            parse_flowchart(direction, body).map(Diagram::Flowchart)
        }
        Some(other) => Err(DiagramError::syntax(
            line_no,
            format!("unknown diagram type '{other}'"),
        )),
        None => Err(DiagramError::syntax(line_no, "missing diagram type")),
    }
}

// =============================================================================
// Sequence Diagrams
// =============================================================================

/// Longest first so `-->>` is not read as `-->`
const MESSAGE_ARROWS: [&str; 8] = ["-->>", "->>", "--x", "-x", "--)", "-)", "-->", "->"];

const BLOCK_OPENERS: [&str; 8] = [
    "loop", "alt", "opt", "par", "critical", "break", "rect", "box",
];

const BLOCK_BRANCHES: [&str; 3] = ["else", "and", "option"];

/// Split `keyword rest` into the keyword and the trimmed rest
fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    }
}

fn parse_sequence(lines: &[(usize, &str)]) -> Result<SequenceDiagram, DiagramError> {
    let mut diagram = SequenceDiagram::default();
    let mut open_blocks: Vec<(usize, String)> = Vec::new();

    for &(line_no, line) in lines {
        let line = line.trim_end_matches(';');
        let (keyword, rest) = split_keyword(line);

        match keyword {
            "participant" | "actor" => {
                if rest.is_empty() {
                    return Err(DiagramError::syntax(
                        line_no,
                        format!("{keyword} needs a name"),
                    ));
                }
                let (id, label) = match rest.split_once(" as ") {
                    Some((id, label)) => (id.trim(), label.trim()),
                    None => (rest, rest),
                };
                diagram.declare(id, label);
            }
            "autonumber" => diagram.autonumber = true,
            "title" => {
                diagram.title = Some(rest.trim_start_matches(':').trim().to_string());
            }
            "title:" => diagram.title = Some(rest.to_string()),
            "activate" | "deactivate" => {
                if rest.is_empty() {
                    return Err(DiagramError::syntax(
                        line_no,
                        format!("{keyword} needs a participant"),
                    ));
                }
                diagram.ensure(rest);
            }
            k if k.eq_ignore_ascii_case("note") => {
                let item = parse_note(line_no, rest, &mut diagram)?;
                diagram.items.push(item);
            }
            k if BLOCK_OPENERS.contains(&k) => {
                open_blocks.push((line_no, k.to_string()));
                diagram.items.push(SequenceItem::BlockStart {
                    keyword: k.to_string(),
                    label: rest.to_string(),
                });
            }
            k if BLOCK_BRANCHES.contains(&k) => {
                if open_blocks.is_empty() {
                    return Err(DiagramError::syntax(
                        line_no,
                        format!("'{k}' outside of a block"),
                    ));
                }
                diagram.items.push(SequenceItem::BlockBranch {
                    keyword: k.to_string(),
                    label: rest.to_string(),
                });
            }
            "end" => {
                if open_blocks.pop().is_none() {
                    return Err(DiagramError::syntax(line_no, "unexpected 'end'"));
                }
                diagram.items.push(SequenceItem::BlockEnd);
            }
            _ => {
                let item = parse_message(line_no, line, &mut diagram)?;
                diagram.items.push(item);
            }
        }
    }

    if let Some((line_no, keyword)) = open_blocks.pop() {
        return Err(DiagramError::syntax(
            line_no,
            format!("'{keyword}' block is never closed"),
        ));
    }

    Ok(diagram)
}

fn parse_note(
    line_no: usize,
    rest: &str,
    diagram: &mut SequenceDiagram,
) -> Result<SequenceItem, DiagramError> {
    let (placement, text) = rest
        .split_once(':')
        .ok_or_else(|| DiagramError::syntax(line_no, "expected ':' in note"))?;
    let placement = placement.trim();

    let targets = ["over ", "left of ", "right of "]
        .iter()
        .find_map(|p| placement.strip_prefix(p))
        .ok_or_else(|| {
            DiagramError::syntax(line_no, "expected 'over', 'left of' or 'right of' in note")
        })?;

    for target in targets.split(',').map(str::trim) {
        if target.is_empty() {
            return Err(DiagramError::syntax(line_no, "note needs a participant"));
        }
        diagram.ensure(target);
    }

    Ok(SequenceItem::Note {
        placement: placement.to_string(),
        text: text.trim().to_string(),
    })
}

fn parse_message(
    line_no: usize,
    line: &str,
    diagram: &mut SequenceDiagram,
) -> Result<SequenceItem, DiagramError> {
    let (at, arrow) = line
        .match_indices('-')
        .find_map(|(i, _)| {
            MESSAGE_ARROWS
                .iter()
                .find(|a| line[i..].starts_with(**a))
                .map(|a| (i, *a))
        })
        .ok_or_else(|| {
            DiagramError::syntax(line_no, format!("unrecognized statement '{line}'"))
        })?;

    let from = line[..at].trim();
    let (to, text) = line[at + arrow.len()..]
        .split_once(':')
        .ok_or_else(|| DiagramError::syntax(line_no, "expected ':' after message target"))?;
    let to = to.trim().trim_start_matches(['+', '-']).trim();

    if from.is_empty() {
        return Err(DiagramError::syntax(line_no, "message has no sender"));
    }
    if to.is_empty() {
        return Err(DiagramError::syntax(line_no, "message has no receiver"));
    }

    diagram.ensure(from);
    diagram.ensure(to);

    Ok(SequenceItem::Message {
        from: from.to_string(),
        to: to.to_string(),
        arrow,
        text: text.trim().to_string(),
    })
}

impl SequenceDiagram {
    fn declare(&mut self, id: &str, label: &str) {
        match self.participants.iter_mut().find(|(pid, _)| pid == id) {
            Some(existing) => existing.1 = label.to_string(),
            None => self.participants.push((id.to_string(), label.to_string())),
        }
    }

    fn ensure(&mut self, id: &str) {
        if !self.participants.iter().any(|(pid, _)| pid == id) {
            self.participants.push((id.to_string(), id.to_string()));
        }
    }

    fn label<'a>(&'a self, id: &'a str) -> &'a str {
        self.participants
            .iter()
            .find(|(pid, _)| pid == id)
            .map_or(id, |(_, label)| label.as_str())
    }

    fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(ref title) = self.title {
            lines.push(title.clone());
        }

        let names: Vec<&str> = self.participants.iter().map(|(_, l)| l.as_str()).collect();
        lines.push(format!("Participants: {}", names.join(", ")));

        let mut depth = 0usize;
        let mut number = 0usize;
        for item in &self.items {
            let indent = "  ".repeat(depth);
            match item {
                SequenceItem::Message {
                    from,
                    to,
                    arrow,
                    text,
                } => {
                    let prefix = if self.autonumber {
                        number += 1;
                        format!("{number}. ")
                    } else {
                        String::new()
                    };
                    lines.push(format!(
                        "{indent}{prefix}{} {arrow} {}: {text}",
                        self.label(from),
                        self.label(to)
                    ));
                }
                SequenceItem::Note { placement, text } => {
                    lines.push(format!("{indent}[note {placement}] {text}"));
                }
                SequenceItem::BlockStart { keyword, label } => {
                    lines.push(format!("{indent}{keyword} {label}").trim_end().to_string());
                    depth += 1;
                }
                SequenceItem::BlockBranch { keyword, label } => {
                    let outer = "  ".repeat(depth.saturating_sub(1));
                    lines.push(format!("{outer}{keyword} {label}").trim_end().to_string());
                }
                SequenceItem::BlockEnd => {
                    depth = depth.saturating_sub(1);
                    lines.push(format!("{}end", "  ".repeat(depth)));
                }
            }
        }
        lines
    }
}

// =============================================================================
// Flowcharts
// =============================================================================

/// Node shape delimiters, longest opener first
const NODE_SHAPES: [(&str, &str); 10] = [
    ("(((", ")))"),
    ("((", "))"),
    ("([", "])"),
    ("[[", "]]"),
    ("[(", ")]"),
    ("{{", "}}"),
    ("[", "]"),
    ("(", ")"),
    ("{", "}"),
    (">", "]"),
];

const STYLE_KEYWORDS: [&str; 5] = ["classDef", "class", "style", "click", "linkStyle"];

fn parse_flowchart(
    direction: Direction,
    lines: &[(usize, &str)],
) -> Result<Flowchart, DiagramError> {
    let mut chart = Flowchart {
        direction,
        nodes: Vec::new(),
        edges: Vec::new(),
        subgraphs: Vec::new(),
    };
    let mut open_subgraphs: Vec<usize> = Vec::new();

    for &(line_no, line) in lines {
        for statement in split_statements(line) {
            let (keyword, rest) = split_keyword(statement);
            match keyword {
                "subgraph" => {
                    open_subgraphs.push(line_no);
                    let title = subgraph_title(rest);
                    chart.subgraphs.push(title.to_string());
                }
                "end" => {
                    if open_subgraphs.pop().is_none() {
                        return Err(DiagramError::syntax(line_no, "unexpected 'end'"));
                    }
                }
                "direction" => {
                    if Direction::parse(rest).is_none() {
                        return Err(DiagramError::syntax(
                            line_no,
                            format!("unknown direction '{rest}'"),
                        ));
                    }
                }
                k if STYLE_KEYWORDS.contains(&k) => {}
                _ => {
                    let mut cursor = Cursor::new(statement, line_no);
                    cursor.statement(&mut chart)?;
                }
            }
        }
    }

    if let Some(line_no) = open_subgraphs.pop() {
        return Err(DiagramError::syntax(line_no, "'subgraph' is never closed"));
    }

    Ok(chart)
}

/// `subgraph id [Title]` shows the title, `subgraph Title` shows itself
fn subgraph_title(rest: &str) -> &str {
    rest.split_once('[')
        .and_then(|(_, t)| t.strip_suffix(']'))
        .map_or(rest, str::trim)
        .trim_matches('"')
}

/// Split a line on `;` outside of brackets and quotes
fn split_statements(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '[' | '(' | '{' if !quoted => depth += 1,
            ']' | ')' | '}' if !quoted => depth -= 1,
            ';' if !quoted && depth <= 0 => {
                parts.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str, line: usize) -> Self {
        Self { src, pos: 0, line }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        self.pos = self.src.len() - self.rest().trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.rest().trim().is_empty()
    }

    fn error(&self, reason: impl Into<String>) -> DiagramError {
        DiagramError::syntax(self.line, reason)
    }

    /// `group (link group)*`
    fn statement(&mut self, chart: &mut Flowchart) -> Result<(), DiagramError> {
        let mut previous = self.node_group(chart)?;

        loop {
            self.skip_ws();
            if self.at_end() {
                return Ok(());
            }

            let Some((style, label)) = self.link()? else {
                return Err(self.error(format!("expected a link, found '{}'", self.rest())));
            };

            self.skip_ws();
            if self.at_end() {
                return Err(self.error("link has no target"));
            }
            let next = self.node_group(chart)?;

            for from in &previous {
                for to in &next {
                    chart.edges.push(Edge {
                        from: from.clone(),
                        to: to.clone(),
                        style,
                        label: label.clone(),
                    });
                }
            }
            previous = next;
        }
    }

    /// `node (& node)*`
    fn node_group(&mut self, chart: &mut Flowchart) -> Result<Vec<String>, DiagramError> {
        let mut ids = vec![self.node(chart)?];
        loop {
            let checkpoint = self.pos;
            self.skip_ws();
            if self.eat("&") {
                self.skip_ws();
                ids.push(self.node(chart)?);
            } else {
                self.pos = checkpoint;
                return Ok(ids);
            }
        }
    }

    fn node(&mut self, chart: &mut Flowchart) -> Result<String, DiagramError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(match rest.chars().next() {
                Some(c) => self.error(format!("expected a node id, found '{c}'")),
                None => self.error("expected a node id"),
            });
        }
        let id = rest[..len].to_string();
        self.pos += len;

        let mut label = None;
        for (open, close) in NODE_SHAPES {
            if self.eat(open) {
                let rest = self.rest();
                let end = rest
                    .find(close)
                    .ok_or_else(|| self.error(format!("node '{id}' is missing '{close}'")))?;
                label = Some(rest[..end].trim().trim_matches('"').to_string());
                self.pos += end + close.len();
                break;
            }
        }

        if self.eat(":::") {
            let rest = self.rest();
            let len = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
                .unwrap_or(rest.len());
            self.pos += len;
        }

        chart.define(&id, label);
        Ok(id)
    }

    /// A link with its optional label, or `None` when no link starts here
    fn link(&mut self) -> Result<Option<(LinkStyle, Option<String>)>, DiagramError> {
        let rest = self.rest();
        let run = rest
            .find(|c: char| !matches!(c, '<' | '-' | '.' | '='))
            .unwrap_or(rest.len());
        let body = &rest[..run];
        if body.trim_start_matches('<').len() < 2 {
            return Ok(None);
        }

        let head = rest[run..]
            .chars()
            .next()
            .filter(|c| matches!(c, '>' | 'o' | 'x'));
        let complete = head.is_some()
            || (body.len() > 2 && (body.ends_with("--") || body.ends_with("==")))
            || body.ends_with(".-");

        let mut label = None;
        let style;
        if complete {
            style = classify(body, head.is_some());
            self.pos += run + head.map_or(0, char::len_utf8);
        } else {
            // `-- text -->`, `== text ==>`, `-. text .->`
            let closers: &[&str] = match body.trim_start_matches('<') {
                "--" => &["-->", "---"],
                "==" => &["==>", "==="],
                "-." => &[".->", ".-"],
                _ => return Err(self.error(format!("malformed link '{body}'"))),
            };
            let after = &rest[run..];
            let (end, closer) = closers
                .iter()
                .filter_map(|c| after.find(*c).map(|i| (i, *c)))
                .min_by_key(|(i, _)| *i)
                .ok_or_else(|| self.error("link text is never closed"))?;
            let text = after[..end].trim();
            if !text.is_empty() {
                label = Some(text.to_string());
            }
            style = classify(closer, closer.ends_with('>'));
            self.pos += run + end + closer.len();
        }

        let checkpoint = self.pos;
        self.skip_ws();
        if self.eat("|") {
            let rest = self.rest();
            let end = rest
                .find('|')
                .ok_or_else(|| self.error("link label is missing closing '|'"))?;
            let text = rest[..end].trim().trim_matches('"');
            if !text.is_empty() {
                label = Some(text.to_string());
            }
            self.pos += end + 1;
        } else {
            self.pos = checkpoint;
        }

        Ok(Some((style, label)))
    }
}

fn classify(token: &str, has_head: bool) -> LinkStyle {
    if token.contains('=') {
        LinkStyle::Thick
    } else if token.contains('.') {
        LinkStyle::Dotted
    } else if has_head {
        LinkStyle::Arrow
    } else {
        LinkStyle::Open
    }
}

impl Flowchart {
    fn define(&mut self, id: &str, label: Option<String>) {
        match self.nodes.iter_mut().find(|(nid, _)| nid == id) {
            Some(existing) => {
                if let Some(label) = label {
                    existing.1 = label;
                }
            }
            None => {
                let label = label.unwrap_or_else(|| id.to_string());
                self.nodes.push((id.to_string(), label));
            }
        }
    }

    fn label<'a>(&'a self, id: &'a str) -> &'a str {
        self.nodes
            .iter()
            .find(|(nid, _)| nid == id)
            .map_or(id, |(_, label)| label.as_str())
    }

    fn render(&self) -> Vec<String> {
        let mut lines = vec![format!("Flowchart, {}", self.direction.describe())];

        for edge in &self.edges {
            let mut line = format!(
                "[{}] {} [{}]",
                self.label(&edge.from),
                edge.style.token(),
                self.label(&edge.to)
            );
            if let Some(ref label) = edge.label {
                line.push_str(&format!(" ({label})"));
            }
            lines.push(line);
        }

        for (id, label) in &self.nodes {
            let linked = self.edges.iter().any(|e| &e.from == id || &e.to == id);
            if !linked {
                lines.push(format!("[{label}]"));
            }
        }

        if !self.subgraphs.is_empty() {
            lines.push(format!("Groups: {}", self.subgraphs.join(", ")));
        }
        lines
    }
}

// =============================================================================
// Tests
// =============================================================================
