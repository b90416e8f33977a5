//! Architectural Enforcement
//!
//! Line-based source scanners used by the integration tests in `tests/`:
//! - No blocking I/O inside async functions
//! - No `sleep()` calls in production code
//!
//! The scanners are heuristic. They look at the enclosing `fn` signature and
//! the `#[cfg(test)]` module convention rather than parsing Rust.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source trees, relative to the workspace root
pub const PRODUCTION_DIRS: [&str; 2] = ["client/core/src", "tui/src"];

/// A source file loaded for scanning
#[derive(Debug)]
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,
    /// File content
    pub content: String,
}

impl SourceFile {
    /// Content split into lines
    pub fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }
}

/// What kind of function a line sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnContext {
    /// Inside `async fn`
    Async,
    /// Inside a plain `fn`
    Sync,
    /// Inside test code (`#[cfg(test)]` module or `#[test]` function)
    Test,
    /// Module level, outside any function
    TopLevel,
}

/// A rule violation at a specific line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the violation
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Offending source line, trimmed
    pub source: String,
    /// Why the line was flagged
    pub reason: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} - {} ({})",
            self.path.display(),
            self.line,
            self.source,
            self.reason
        )
    }
}

/// Workspace root, two levels above this crate
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Every `.rs` file under `dir`, skipping unreadable entries
pub fn rust_sources(dir: &Path) -> Vec<SourceFile> {
    if !dir.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            Some(SourceFile {
                path: e.path().to_path_buf(),
                content,
            })
        })
        .collect()
}

/// Every production source file in the workspace
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| rust_sources(&root.join(dir)))
        .collect()
}

/// The part of a line before any `//` comment
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Is `line` a function signature? Returns `Some(true)` for `async fn`.
pub fn fn_signature(line: &str) -> Option<bool> {
    let mut rest = line.trim_start();
    for prefix in ["pub(crate) ", "pub(super) ", "pub ", "const ", "unsafe "] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
        }
    }

    if rest.starts_with("async fn ") {
        Some(true)
    } else if rest.starts_with("fn ") {
        Some(false)
    } else {
        None
    }
}

/// Classify the function enclosing line `idx`
pub fn context_at(lines: &[&str], idx: usize) -> FnContext {
    if lines[..=idx]
        .iter()
        .any(|l| l.trim_start().starts_with("#[cfg(test)]"))
    {
        return FnContext::Test;
    }

    for i in (0..=idx).rev() {
        let line = lines[i];
        if let Some(is_async) = fn_signature(line) {
            if has_test_attribute(lines, i) {
                return FnContext::Test;
            }
            return if is_async {
                FnContext::Async
            } else {
                FnContext::Sync
            };
        }

        // Items at column zero end the search
        if i < idx && is_item_boundary(line) {
            return FnContext::TopLevel;
        }
    }
    FnContext::TopLevel
}

fn has_test_attribute(lines: &[&str], fn_idx: usize) -> bool {
    for line in lines[..fn_idx].iter().rev() {
        let line = line.trim();
        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }
        if !line.starts_with("#[") && !line.starts_with("///") {
            return false;
        }
    }
    false
}

fn is_item_boundary(line: &str) -> bool {
    ["impl", "mod ", "pub mod ", "struct ", "pub struct ", "enum ", "pub enum ", "}"]
        .iter()
        .any(|p| line.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_signature() {
        assert_eq!(fn_signature("    pub async fn check(&self) {"), Some(true));
        assert_eq!(fn_signature("pub(crate) fn syntax(line: usize) {"), Some(false));
        assert_eq!(fn_signature("fn main() {"), Some(false));
        assert_eq!(fn_signature("let f = async move {"), None);
    }

    #[test]
    fn test_context_async_and_sync() {
        let code = vec![
            "impl Client {",
            "    pub async fn load(&self) {",
            "        let x = 1;",
            "    }",
            "",
            "    fn read(&self) {",
            "        let y = 2;",
            "    }",
            "}",
        ];
        assert_eq!(context_at(&code, 2), FnContext::Async);
        assert_eq!(context_at(&code, 6), FnContext::Sync);
    }

    #[test]
    fn test_context_test_code() {
        let code = vec![
            "fn helper() {}",
            "#[cfg(test)]",
            "mod tests {",
            "    fn setup() {",
            "        let z = 3;",
            "    }",
            "}",
        ];
        assert_eq!(context_at(&code, 0), FnContext::Sync);
        assert_eq!(context_at(&code, 4), FnContext::Test);
    }

    #[test]
    fn test_context_test_attribute() {
        let code = vec![
            "#[tokio::test]",
            "async fn test_stream() {",
            "    let w = 4;",
            "}",
        ];
        assert_eq!(context_at(&code, 2), FnContext::Test);
    }

    #[test]
    fn test_context_top_level() {
        let code = vec!["use std::fs::File;", "", "const X: u8 = 1;"];
        assert_eq!(context_at(&code, 0), FnContext::TopLevel);
        assert_eq!(context_at(&code, 2), FnContext::TopLevel);
    }

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let a = 1; // std::fs::read"), "let a = 1; ");
    }

    #[test]
    fn test_workspace_has_production_dirs() {
        let root = workspace_root();
        for dir in PRODUCTION_DIRS {
            assert!(root.join(dir).exists(), "missing {dir}");
        }
    }
}
