//! Widgets
//!
//! Custom ratatui widgets used by the chat surface.

mod markdown;
mod text_block;

pub use markdown::markdown_lines;
pub use text_block::{Align, Segment, TextBlock, TextBlockState};
