//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code in the client core and TUI MUST NOT use blocking I/O.
//! **Required**: `reqwest` async calls, `tokio::net`, `tokio::fs`.
//!
//! Blocking calls are tolerated in plain `fn`s that run outside the event
//! loop (config loading, log file setup) and in test code.

use architectural_enforcement::{code_part, context_at, production_sources, FnContext, Violation};

const FORBIDDEN: [(&str, &str); 6] = [
    ("std::fs::", "blocking filesystem call"),
    ("use std::fs", "blocking filesystem import"),
    ("std::net::", "blocking socket"),
    ("std::process::Command", "blocking subprocess"),
    ("reqwest::blocking", "blocking HTTP client"),
    (".read_line(", "blocking stdin read"),
];

/// Blocking I/O patterns in `lines`, outside sync and test code
fn scan(path: &std::path::Path, lines: &[&str]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let code = code_part(line);
        let Some((_, reason)) = FORBIDDEN.iter().find(|(p, _)| code.contains(p)) else {
            continue;
        };

        match context_at(lines, idx) {
            FnContext::Sync | FnContext::Test => continue,
            FnContext::Async | FnContext::TopLevel => {}
        }

        violations.push(Violation {
            path: path.to_path_buf(),
            line: idx + 1,
            source: line.trim().to_string(),
            reason: (*reason).to_string(),
        });
    }
    violations
}

#[test]
fn test_no_blocking_io_in_production_code() {
    let sources = production_sources();
    assert!(!sources.is_empty(), "no production sources found");

    let violations: Vec<Violation> = sources
        .iter()
        .flat_map(|file| scan(&file.path, &file.lines()))
        .collect();

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in async production code:");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse the async equivalents, or move the call into a plain fn");
        eprintln!("that runs before the event loop starts.");

        panic!("Found {} blocking I/O violation(s)", violations.len());
    }
}

#[test]
fn test_detects_blocking_call_in_async_fn() {
    let code = vec![
        "pub async fn load(&self) -> String {",
        "    std::fs::read_to_string(\"diagram.mmd\").unwrap_or_default()",
        "}",
    ];
    let found = scan(std::path::Path::new("x.rs"), &code);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line, 2);
}

#[test]
fn test_detects_top_level_import() {
    let code = vec!["use std::fs::OpenOptions;", "", "async fn run() {}"];
    assert_eq!(scan(std::path::Path::new("x.rs"), &code).len(), 1);
}

#[test]
fn test_allows_sync_fn_and_tests() {
    let code = vec![
        "fn load_file(path: &Path) -> String {",
        "    std::fs::read_to_string(path).unwrap_or_default()",
        "}",
        "",
        "#[cfg(test)]",
        "mod tests {",
        "    #[tokio::test]",
        "    async fn test_server() {",
        "        let l = std::net::TcpListener::bind(\"127.0.0.1:0\");",
        "    }",
        "}",
    ];
    assert!(scan(std::path::Path::new("x.rs"), &code).is_empty());
}

#[test]
fn test_ignores_comments() {
    let code = vec!["async fn f() {", "    // std::fs::read is not allowed here", "}"];
    assert!(scan(std::path::Path::new("x.rs"), &code).is_empty());
}
