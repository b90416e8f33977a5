//! Theme and Colors
//!
//! A small palette: one accent per speaker, plus status colors for health
//! and failures.

use ratatui::style::Color;

// ============================================================================
// Speaker Colors
// ============================================================================

/// User entries and input text
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// Assistant step output
pub const ASSISTANT_CYAN: Color = Color::Rgb(120, 200, 230);

/// Step errors and stream failures
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

// ============================================================================
// UI Colors
// ============================================================================

/// Header title and panel titles
pub const ACCENT_MAGENTA: Color = Color::Magenta;

/// Hints, placeholders, borders
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Backend reports healthy
pub const SUCCESS_GREEN: Color = Color::Rgb(120, 230, 120);

/// Health not probed yet, or stream running
pub const PENDING_YELLOW: Color = Color::Rgb(255, 223, 128);

/// Inline code and code blocks in transcript Markdown
pub const CODE_AMBER: Color = Color::Rgb(230, 180, 100);

/// Rendered diagram text
pub const DIAGRAM_BLUE: Color = Color::Rgb(150, 180, 255);
