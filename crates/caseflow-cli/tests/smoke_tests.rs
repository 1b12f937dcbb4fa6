//! Smoke tests for the caseflow CLI
//!
//! These exercise the binary end to end without a browser: listing steps,
//! validating the demo feature files and printing configuration.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get a command for the caseflow binary
fn caseflow() -> Command {
    let mut cmd = Command::cargo_bin("caseflow").expect("caseflow binary should exist");
    cmd.env_remove("RUST_LOG").env_remove("CASEFLOW_CONFIG");
    cmd
}

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    caseflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    caseflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("steps"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_no_args_fails() {
    caseflow().assert().failure();
}

// ============================================================================
// steps
// ============================================================================

#[test]
fn test_steps_text() {
    caseflow()
        .arg("steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("see_end_state"))
        .stdout(predicate::str::contains("state_check"))
        .stdout(predicate::str::contains("25 steps"));
}

#[test]
fn test_steps_json_is_parseable() {
    let output = caseflow()
        .args(["steps", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let steps: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = steps
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"get_case_ref_from_url".to_string()));
    assert!(names.contains(&"fill_case_page".to_string()));
    assert_eq!(names.len(), 25);
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_demo_features() {
    let features = demos().join("features");
    caseflow()
        .arg("validate")
        .arg(features.join("grant_of_probate.yaml"))
        .arg(features.join("will_lodgement.yaml"))
        .arg(features.join("solicitor_share_case.yaml"))
        .assert()
        .success();
}

#[test]
fn test_validate_reports_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(
        &path,
        "feature: bad\nscenarios:\n  - name: s\n    steps:\n      - step: change_state\n        args: { state: Stopped }\n      - step: change_state\n        args: { state: Issued }\n",
    )
    .unwrap();

    caseflow()
        .args(["--color", "never", "validate"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("without a state check"))
        .stderr(predicate::str::contains("1 of 1 feature files are invalid"));
}

#[test]
fn test_validate_missing_file() {
    caseflow()
        .args(["validate", "/nonexistent/feature.yaml"])
        .assert()
        .failure();
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_redacts_passwords() {
    caseflow()
        .args(["config", "--config"])
        .arg(demos().join("config.yaml"))
        .env("CASEFLOW_CASEWORKER_USERNAME", "cw@probate.test")
        .env("CASEFLOW_CASEWORKER_PASSWORD", "s3cret-value")
        .assert()
        .success()
        .stdout(predicate::str::contains("cw@probate.test"))
        .stdout(predicate::str::contains("s3cret-value").not());
}

#[test]
fn test_config_rejects_bad_url() {
    caseflow()
        .arg("config")
        .env("CASEFLOW_BACK_OFFICE_URL", "ftp://nowhere")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

// ============================================================================
// run
// ============================================================================

#[test]
fn test_run_rejects_invalid_feature_before_browser() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unknown.yaml");
    fs::write(
        &path,
        "feature: f\nscenarios:\n  - name: s\n    steps:\n      - step: fly_to_the_moon\n",
    )
    .unwrap();

    caseflow()
        .arg("run")
        .arg(&path)
        .args(["--output"])
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("fly_to_the_moon"));
}
