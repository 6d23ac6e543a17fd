//! CLI end-to-end tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use image::{Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;

fn edupulse(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_edupulse"));
    cmd.env("EDUPULSE_DATA_DIR", dir.path())
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env("RUST_LOG", "off");
    cmd
}

fn run(dir: &TempDir, args: &[&str]) -> Output {
    edupulse(dir).args(args).output().expect("failed to run edupulse")
}

fn run_ok(dir: &TempDir, args: &[&str]) -> String {
    let output = run(dir, args);
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn run_json(dir: &TempDir, args: &[&str]) -> Value {
    serde_json::from_str(&run_ok(dir, args)).expect("stdout is not JSON")
}

fn write_frame(path: &Path, value: u8) {
    RgbaImage::from_pixel(16, 9, Rgba([value, value, value, 255]))
        .save(path)
        .unwrap();
}

#[test]
fn config_defaults_are_readable() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(&dir, &["config", "get", "engagement.threshold"]).trim(), "0.9");
    assert_eq!(run_ok(&dir, &["config", "get", "timer.focus_secs"]).trim(), "1500");
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn config_set_persists() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(&dir, &["config", "set", "engagement.threshold", "0.8"]).trim(), "ok");
    assert_eq!(run_ok(&dir, &["config", "get", "engagement.threshold"]).trim(), "0.8");

    let listing = run_ok(&dir, &["config", "list"]);
    assert!(listing.contains("engagement.threshold = 0.8"));
}

#[test]
fn config_rejects_out_of_range_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&dir, &["config", "set", "engagement.threshold", "1.5"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
    assert_eq!(run_ok(&dir, &["config", "get", "engagement.threshold"]).trim(), "0.9");
}

#[test]
fn config_get_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&dir, &["config", "get", "no.such.key"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn fresh_progress_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let progress = run_json(&dir, &["progress", "show", "--json"]);
    assert_eq!(progress["points"], 0);
    assert_eq!(progress["sessions_completed"], 0);
    assert_eq!(progress["achievements"].as_array().unwrap().len(), 0);

    assert!(run_ok(&dir, &["progress", "reset"]).contains("progress reset"));
}

#[test]
fn achievements_lists_whole_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let rows = run_json(&dir, &["achievements", "--json"]);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r["unlocked"] == false));
    assert_eq!(rows[0]["id"], "first_points");
}

#[test]
fn challenge_without_api_key_uses_fallback_fact() {
    let dir = tempfile::tempdir().unwrap();
    let challenge = run_json(&dir, &["challenge", "--json"]);
    assert_eq!(challenge["type"], "fun_fact");
    assert!(challenge["fact"].as_str().unwrap().contains("honey"));
}

#[test]
fn dashboard_for_new_user() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_json(&dir, &["dashboard", "--json"]);
    assert_eq!(summary["focus_minutes"], 0);
    assert_eq!(summary["current_percent"], 100);
    assert_eq!(summary["achievements_remaining"], 5);
    assert_eq!(summary["recommendations"].as_array().unwrap().len(), 3);
}

#[test]
fn motion_diff_detects_change() {
    let dir = tempfile::tempdir().unwrap();
    let dark = dir.path().join("dark.png");
    let light = dir.path().join("light.png");
    write_frame(&dark, 0);
    write_frame(&light, 255);

    let moved = run_json(
        &dir,
        &["motion", "diff", dark.to_str().unwrap(), light.to_str().unwrap(), "--json"],
    );
    assert!(moved["mean_delta"].as_f64().unwrap() > 250.0);
    assert_eq!(moved["motion"], true);

    let still = run_json(
        &dir,
        &["motion", "diff", dark.to_str().unwrap(), dark.to_str().unwrap(), "--json"],
    );
    assert_eq!(still["mean_delta"], 0.0);
    assert_eq!(still["motion"], false);
}

#[test]
fn motion_diff_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&dir, &["motion", "diff", "missing-a.png", "missing-b.png"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error:"));
}

#[test]
fn session_streams_events_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = edupulse(&dir)
        .args(["session", "--start"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"h\nq\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let types: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| {
            let event: Value = serde_json::from_str(line).expect("event line is JSON");
            event["type"].as_str().unwrap().to_string()
        })
        .collect();
    for expected in [
        "phase_changed",
        "tracking_started",
        "visibility_penalty",
        "tracking_stopped",
    ] {
        assert!(types.iter().any(|t| t == expected), "missing {expected} in {types:?}");
    }
}

#[test]
fn session_with_missing_camera_dir_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("no-frames");
    let mut child = edupulse(&dir)
        .args(["session", "--camera-dir", frames.to_str().unwrap()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"q\n").unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let camera_off = stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .any(|e| e["type"] == "camera_state_changed" && e["on"] == false);
    assert!(camera_off);
    assert!(String::from_utf8_lossy(&output.stderr).contains("camera unavailable"));
}
