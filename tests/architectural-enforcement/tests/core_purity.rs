//! Integration Test: Widget Core Purity
//!
//! **Policy**: the widget core runs entirely on the host's execution context.
//! It must not start threads or runtime tasks, must not block the thread
//! while waiting, and must not depend on any UI framework.
//!
//! **Exceptions**: test modules (`#[cfg(test)]`) and integration tests.

use std::fs;

use architectural_enforcement::{assert_no_violations, find_violations, workspace_root};

const CORE_SRC: &str = "widget/core/src";

#[test]
fn test_core_spawns_no_threads_or_tasks() {
    let violations = find_violations(
        CORE_SRC,
        &[
            "thread::spawn",
            "thread::Builder",
            "tokio::spawn",
            "task::spawn",
            "spawn_blocking",
            "Runtime::new",
        ],
    );

    assert_no_violations("widget core must not spawn threads or tasks", &violations);
}

#[test]
fn test_core_has_no_blocking_sleep() {
    let violations = find_violations(CORE_SRC, &["thread::sleep", "std::thread::park"]);

    assert_no_violations(
        "widget core must wait with async timers, never block the thread",
        &violations,
    );
}

#[test]
fn test_core_has_no_ui_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("widget/core/Cargo.toml"))
        .expect("widget core manifest should be readable");

    let forbidden = ["ratatui", "crossterm", "termion", "textwrap", "egui", "tauri"];
    let found: Vec<&str> = forbidden
        .iter()
        .copied()
        .filter(|name| manifest.lines().any(|l| l.trim_start().starts_with(name)))
        .collect();

    assert!(
        found.is_empty(),
        "widget core depends on UI crates: {found:?}"
    );
}

#[test]
fn test_core_does_not_print() {
    let violations = find_violations(CORE_SRC, &["println!", "eprintln!", "print!("]);

    assert_no_violations(
        "widget core must log through tracing, never print",
        &violations,
    );
}
