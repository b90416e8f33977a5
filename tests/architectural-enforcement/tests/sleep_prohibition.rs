//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code MUST NOT call `sleep()`. Periodic work uses
//! `tokio::time::interval`, and waiting on another task uses channels,
//! `Notify` or join handles. Tests may sleep.

use architectural_enforcement::{code_part, context_at, production_sources, FnContext, Violation};

/// `sleep()` calls in `lines` outside test code
fn scan(path: &std::path::Path, lines: &[&str]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let code = code_part(line);
        if !(code.contains("::sleep(") || code.contains(".sleep(")) {
            continue;
        }
        if context_at(lines, idx) == FnContext::Test {
            continue;
        }

        violations.push(Violation {
            path: path.to_path_buf(),
            line: idx + 1,
            source: line.trim().to_string(),
            reason: "sleep in production code".to_string(),
        });
    }
    violations
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations: Vec<Violation> = production_sources()
        .iter()
        .flat_map(|file| scan(&file.path, &file.lines()))
        .collect();

    if !violations.is_empty() {
        eprintln!("\nsleep() found in production code:");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::time::interval for polling and redraw ticks.");

        panic!("Found {} sleep violation(s)", violations.len());
    }
}

#[test]
fn test_detects_sleep() {
    let code = vec![
        "pub async fn poll(&self) {",
        "    loop {",
        "        tokio::time::sleep(Duration::from_secs(5)).await;",
        "    }",
        "}",
    ];
    let found = scan(std::path::Path::new("x.rs"), &code);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line, 3);
}

#[test]
fn test_detects_thread_sleep_in_sync_fn() {
    let code = vec!["fn wait() {", "    std::thread::sleep(Duration::from_millis(1));", "}"];
    assert_eq!(scan(std::path::Path::new("x.rs"), &code).len(), 1);
}

#[test]
fn test_allows_sleep_in_tests() {
    let code = vec![
        "#[tokio::test]",
        "async fn test_polling() {",
        "    tokio::time::sleep(Duration::from_millis(10)).await;",
        "}",
    ];
    assert!(scan(std::path::Path::new("x.rs"), &code).is_empty());
}

#[test]
fn test_interval_is_not_sleep() {
    let code = vec![
        "pub fn spawn_polling(&self) {",
        "    let mut ticker = tokio::time::interval(period);",
        "}",
    ];
    assert!(scan(std::path::Path::new("x.rs"), &code).is_empty());
}
