//! CLI integration tests

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the CLI with an isolated home directory
fn loadcurve(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_loadcurve"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("LOADCURVE_CONFIG")
        .output()
        .expect("Failed to execute command")
}

/// Dashboard database with both tables and no rows
fn create_empty_log(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("dashboard.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE CustomGraphData (id INTEGER PRIMARY KEY, graph_id INTEGER, time DATETIME, value REAL);
         CREATE TABLE Request (id INTEGER PRIMARY KEY, endpoint_id INTEGER, duration REAL, time_requested DATETIME);",
    )
    .unwrap();
    path
}

/// Dashboard database with 20s of CPU samples alternating 20/80 and two requests
fn create_log(dir: &TempDir) -> PathBuf {
    let path = create_empty_log(dir);
    let conn = Connection::open(&path).unwrap();
    for i in 0..20 {
        conn.execute(
            "INSERT INTO CustomGraphData (graph_id, time, value) VALUES (1, ?1, ?2)",
            params![
                format!("2021-01-08 10:00:{:02}.000000", i),
                if i % 2 == 0 { 20.0 } else { 80.0 }
            ],
        )
        .unwrap();
    }
    conn.execute_batch(
        "INSERT INTO Request (endpoint_id, duration, time_requested) VALUES
            (1, 100.0, '2021-01-08 10:00:05.000000'),
            (1, 200.0, '2021-01-08 10:00:15.000000');",
    )
    .unwrap();
    path
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = loadcurve(home.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("curve"), "Should show curve command");
    assert!(stdout.contains("windows"), "Should show windows command");
    assert!(stdout.contains("config"), "Should show config command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = loadcurve(home.path(), &["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("loadcurve"), "Should show binary name");
}

/// Test curve subcommand help lists the overrides
#[test]
fn test_curve_help() {
    let home = TempDir::new().unwrap();
    let output = loadcurve(home.path(), &["curve", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Curve help should succeed");
    for flag in [
        "--db",
        "--window-secs",
        "--domain",
        "--rounding",
        "--no-filter",
        "--output",
    ] {
        assert!(stdout.contains(flag), "Should show {flag} option");
    }
}

/// Test the curve command end to end with JSON output
#[test]
fn test_curve_json_output() {
    let dir = TempDir::new().unwrap();
    let db = create_log(&dir);
    let report_path = dir.path().join("report.json");

    let output = loadcurve(
        dir.path(),
        &[
            "--format",
            "json",
            "curve",
            "--db",
            db.to_str().unwrap(),
            "--output",
            report_path.to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "Curve should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["stats"]["windows"], 2);
    assert_eq!(report["points"][0]["utilization"], 50);
    assert_eq!(report["points"][0]["mean_latency"], 150.0);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written, report);
}

/// Test the curve table output
#[test]
fn test_curve_table_output() {
    let dir = TempDir::new().unwrap();
    let db = create_log(&dir);
    let output = loadcurve(dir.path(), &["curve", "--db", db.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Curve should succeed");
    assert!(stdout.contains("Load Curve"));
    assert!(stdout.contains("150.00"), "Should show the mean latency");
    assert!(stdout.contains("75.00"), "Should show the service time");
}

/// Test the windows command with JSON output
#[test]
fn test_windows_json_output() {
    let dir = TempDir::new().unwrap();
    let db = create_log(&dir);
    let output = loadcurve(
        dir.path(),
        &["-f", "json", "windows", "--db", db.to_str().unwrap()],
    );
    assert!(output.status.success(), "Windows should succeed");

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["utilization"], 50.0);
    assert_eq!(rows[1]["offset_secs"], 10.0);
}

/// Test that an empty event log still yields valid JSON
#[test]
fn test_windows_json_output_empty_log() {
    let dir = TempDir::new().unwrap();
    let db = create_empty_log(&dir);
    let output = loadcurve(
        dir.path(),
        &["-f", "json", "windows", "--db", db.to_str().unwrap()],
    );
    assert!(output.status.success(), "Windows should succeed");

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows, serde_json::json!([]));
}

/// Test that a missing event log fails with a message
#[test]
fn test_missing_db_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.db");
    let output = loadcurve(dir.path(), &["curve", "--db", missing.to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Missing db should fail");
    assert!(
        stderr.contains("Failed to derive load curve"),
        "Should explain the failure: {stderr}"
    );
}

/// Test that invalid overrides are rejected before processing
#[test]
fn test_invalid_window_rejected() {
    let dir = TempDir::new().unwrap();
    let output = loadcurve(dir.path(), &["config", "--window-secs", "0"]);
    assert!(!output.status.success(), "Zero window should fail");
}

/// Test the config command reflects overrides
#[test]
fn test_config_command() {
    let dir = TempDir::new().unwrap();
    let output = loadcurve(
        dir.path(),
        &["-f", "json", "config", "--domain", "one", "--no-filter"],
    );
    assert!(output.status.success(), "Config should succeed");

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["buckets"]["domain"], "one_based");
    assert!(config["filter"]["min_utilization"].is_null());
    assert_eq!(config["window"]["duration_secs"], 10.0);
}

/// Test that a configuration file is honored
#[test]
fn test_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loadcurve.toml");
    std::fs::write(&path, "[window]\nduration_secs = 15.0\n").unwrap();

    let output = loadcurve(
        dir.path(),
        &["-f", "json", "--config", path.to_str().unwrap(), "config"],
    );
    assert!(output.status.success(), "Config should succeed");

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["window"]["duration_secs"], 15.0);
}
