//! CLI Output Tests
//!
//! - stdout carries exactly one JSON response
//! - log lines are written to stderr

use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

const CATALOG: &str = r#"{
    "models": [
        {"name": "post"},
        {"name": "comment", "links": [{"name": "post", "target": "post"}]}
    ]
}"#;

fn revcore(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_revcore"))
        .args(args)
        .output()
        .unwrap()
}

fn single_json_line(stdout: &[u8]) -> Value {
    let text = String::from_utf8(stdout.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {}", text);
    serde_json::from_str(lines[0]).unwrap()
}

// =============================================================================
// Output Tests
// =============================================================================

/// `graph` prints only its report on stdout; its log lines go to stderr.
#[test]
fn test_graph_stdout_is_single_response() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");
    fs::write(&path, CATALOG).unwrap();

    let output = revcore(&[
        "graph",
        "--catalog",
        path.to_str().unwrap(),
        "--root",
        "post",
        "--part",
        "comment",
    ]);

    assert!(output.status.success());
    let response = single_json_line(&output.stdout);
    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["root"], "post");

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("GRAPH_BEGIN"));
}

/// A failing command still prints one error response and exits non-zero.
#[test]
fn test_check_error_is_single_response() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("revcore.json");
    fs::write(&path, r#"{"revert_comment": "no placeholder"}"#).unwrap();

    let output = revcore(&["check", "--config", path.to_str().unwrap()]);

    assert!(!output.status.success());
    let response = single_json_line(&output.stdout);
    assert_eq!(response["status"], "error");
    assert_eq!(response["code"], "REV_CLI_CONFIG_ERROR");
}
