//! Golden tests for verifying JSON output format stability
//!
//! Each test serves a small directory tree through the local backend and
//! snapshots the JSON printed by `bfs`.
//!
//! Run with: `cargo test --features golden`

#![cfg(feature = "golden")]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Build the fixture tree:
///
/// ```text
/// docs/a.txt
/// docs/sub/b.md
/// media/
/// ```
fn setup_fixture() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("docs/sub")).unwrap();
    std::fs::create_dir_all(root.join("media")).unwrap();
    std::fs::write(root.join("docs/a.txt"), "hello world").unwrap();
    std::fs::write(root.join("docs/sub/b.md"), "# b").unwrap();
    temp_dir
}

fn run_bfs(root: &Path, args: &[&str]) -> Output {
    let config = root.join("no-such-config.toml");
    Command::new(env!("CARGO_BIN_EXE_bfs"))
        .args(args)
        .arg("--local-root")
        .arg(root)
        .arg("--config")
        .arg(config)
        .env_remove("BFS_CONFIG")
        .env_remove("BFS_LOCAL_ROOT")
        .output()
        .expect("Failed to execute bfs")
}

fn parse_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

/// Remove fields that change from run to run
fn strip_volatile(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.remove("modified_at");
            map.remove("etag");
            map.values_mut().for_each(strip_volatile);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_volatile),
        _ => {}
    }
}

#[test]
fn test_ls_root_json() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["ls", "/", "--json"]);
    assert!(output.status.success(), "Command should succeed");

    let mut json = parse_stdout(&output);
    strip_volatile(&mut json);
    insta::assert_json_snapshot!("ls_root", json);
}

#[test]
fn test_ls_container_json() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["ls", "/docs", "--json"]);
    assert!(output.status.success(), "Command should succeed");

    let mut json = parse_stdout(&output);
    strip_volatile(&mut json);
    insta::assert_json_snapshot!("ls_container", json);
}

#[test]
fn test_ls_pattern_json() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["ls", "/docs", "--pattern", "*.txt", "--json"]);
    assert!(output.status.success(), "Command should succeed");

    let mut json = parse_stdout(&output);
    strip_volatile(&mut json);
    insta::assert_json_snapshot!("ls_pattern", json);
}

#[test]
fn test_stat_file_json() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["stat", "/docs/a.txt", "--json"]);
    assert!(output.status.success(), "Command should succeed");

    let mut json = parse_stdout(&output);
    strip_volatile(&mut json);
    insta::assert_json_snapshot!("stat_file", json);
}

#[test]
fn test_stat_unknown_key_is_directory() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["stat", "/docs/nothing", "--json"]);
    assert!(output.status.success(), "Command should succeed");

    let mut json = parse_stdout(&output);
    strip_volatile(&mut json);
    insta::assert_json_snapshot!("stat_unknown_key", json);
}

#[test]
fn test_cat_prints_content() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["cat", "/docs/a.txt"]);
    assert!(output.status.success(), "Command should succeed");
    assert_eq!(output.stdout, b"hello world");
}

#[test]
fn test_mkdir_then_ls() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["mkdir", "/media/photos", "--json"]);
    assert!(output.status.success(), "Command should succeed");
    insta::assert_json_snapshot!("mkdir_success", parse_stdout(&output));

    assert!(fixture.path().join("media/photos").is_dir());

    let output = run_bfs(fixture.path(), &["ls", "/media", "--json"]);
    let mut json = parse_stdout(&output);
    strip_volatile(&mut json);
    insta::assert_json_snapshot!("ls_after_mkdir", json);
}

#[test]
fn test_mkdir_root_is_usage_error() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["mkdir", "/", "--json"]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let json: serde_json::Value =
        serde_json::from_str(&stderr).expect("Error output should be valid JSON");
    insta::assert_json_snapshot!("mkdir_root_error", json);
}

#[test]
fn test_ls_missing_container_is_not_found() {
    let fixture = setup_fixture();
    let output = run_bfs(fixture.path(), &["ls", "/missing", "--json"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_missing_backend_is_usage_error() {
    let fixture = setup_fixture();
    let output = Command::new(env!("CARGO_BIN_EXE_bfs"))
        .args(["ls", "/", "--json", "--config"])
        .arg(fixture.path().join("no-such-config.toml"))
        .env_remove("BFS_CONFIG")
        .env_remove("BFS_LOCAL_ROOT")
        .output()
        .expect("Failed to execute bfs");
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No backend configured"), "{stderr}");
}
