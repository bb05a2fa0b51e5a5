// crates/twain-direct-cli/tests/commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests for negotiate, check, and config commands.
// Purpose: Ensure the binary prints replies, statuses, and localized errors.
// Dependencies: twain-direct-cli binary, serde_json, tempfile
// ============================================================================

//! CLI command integration tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const CONFIG: &str = r#"
[device]
resolutions = [100, 200, 300]

[logging]
filter = "warn"
"#;

const RESOLUTION_TASK: &str = r#"{"actions":[{"action":"configure","streams":[{"sources":[
    {"source":"any","pixelFormats":[{"pixelFormat":"rgb24","attributes":[
        {"attribute":"resolution","values":[{"value":200}]}]}]}]}]}]}"#;

fn twain_direct_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_twain-direct"))
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(twain_direct_bin())
        .args(args)
        .env_remove("TWAIN_DIRECT_LANG")
        .env_remove("TWAIN_DIRECT_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("run twain-direct")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ============================================================================
// SECTION: Negotiate
// ============================================================================

#[test]
fn negotiate_prints_reply_with_applied_resolution() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "twain-direct.toml", CONFIG);
    let task = write(&dir, "task.json", RESOLUTION_TASK);

    let output =
        run(&["negotiate", "--task", &path_arg(&task), "--config", &path_arg(&config)]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let reply: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reply["actions"][0]["results"], json!({"success": true}));
    let attribute = &reply["actions"][0]["streams"][0]["sources"][0]["pixelFormats"][0]
        ["attributes"][0];
    assert_eq!(attribute["attribute"], json!("resolution"));
    assert_eq!(attribute["values"][0]["value"], json!(200));
}

#[test]
fn negotiate_failure_prints_reply_and_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "twain-direct.toml", CONFIG);
    let task = write(&dir, "task.json", r#"{"actions":["#);

    let output =
        run(&["negotiate", "--task", &path_arg(&task), "--config", &path_arg(&config)]);
    assert!(!output.status.success());

    let reply: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reply["actions"][0]["results"]["code"], json!("invalidJson"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalidJson"), "unexpected stderr: {stderr}");
}

#[test]
fn negotiate_reports_digest_on_stderr() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "twain-direct.toml", CONFIG);
    let task = write(&dir, "task.json", RESOLUTION_TASK);

    let output = run(&[
        "negotiate",
        "--task",
        &path_arg(&task),
        "--config",
        &path_arg(&config),
        "--digest",
    ]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Reply digest (sha256): "), "unexpected stderr: {stderr}");
}

#[test]
fn negotiate_rejects_task_over_configured_limit() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "twain-direct.toml", "[limits]\nmax_task_bytes = 16\n");
    let task = write(&dir, "task.json", RESOLUTION_TASK);

    let output =
        run(&["negotiate", "--task", &path_arg(&task), "--config", &path_arg(&config)]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("exceeds size limit"), "unexpected stderr: {stderr}");
}

// ============================================================================
// SECTION: Check
// ============================================================================

#[test]
fn check_lists_node_statuses() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "twain-direct.toml", CONFIG);
    let task = write(&dir, "task.json", RESOLUTION_TASK);

    let output = run(&["check", "--task", &path_arg(&task), "--config", &path_arg(&config)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("actions[0]: run"), "unexpected stdout: {stdout}");
    assert!(stdout.contains("Task valid (6 nodes)."), "unexpected stdout: {stdout}");
}

#[test]
fn check_reports_invalid_task() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "twain-direct.toml", CONFIG);
    let task = write(
        &dir,
        "task.json",
        r#"{"actions":[{"action":"configure","sources":[{"source":"feeder"}]}]}"#,
    );

    let output = run(&["check", "--task", &path_arg(&task), "--config", &path_arg(&config)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalidTask"), "unexpected stderr: {stderr}");
}

// ============================================================================
// SECTION: Config
// ============================================================================

#[test]
fn config_example_validates() {
    let dir = TempDir::new().unwrap();
    let example = run(&["config", "example"]);
    assert!(example.status.success());
    let path = write(&dir, "twain-direct.toml", &String::from_utf8(example.stdout).unwrap());

    let output = run(&["config", "validate", "--config", &path_arg(&path)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Config valid."), "unexpected stdout: {stdout}");
}

#[test]
fn config_validate_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "twain-direct.toml", "[scanner]\nmodel = \"x\"\n");

    let output = run(&["config", "validate", "--config", &path_arg(&path)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load config"), "unexpected stderr: {stderr}");
}

#[test]
fn catalan_output_is_selected_by_flag() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "twain-direct.toml", CONFIG);

    let output = run(&["--lang", "ca", "config", "validate", "--config", &path_arg(&path)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuració vàlida."), "unexpected stdout: {stdout}");
}
