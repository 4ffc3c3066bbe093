//! Integration tests for the `wardenctl` binary.
//!
//! These only exercise argument parsing and `--help`/`--version` output —
//! anything that needs a live `wardend` on the bus is out of scope for a
//! sandboxed test run.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::Command;

fn wardenctl_bin() -> String {
    let path = env!("CARGO_BIN_EXE_wardenctl");
    assert!(Path::new(path).exists(), "wardenctl binary not found at {path}");
    path.to_owned()
}

fn run(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(wardenctl_bin()).args(args).output().expect("failed to execute wardenctl");
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

#[test]
fn version_flag_reports_the_binary_name() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("wardenctl"), "stdout was: {stdout}");
}

#[test]
fn help_lists_every_top_level_subcommand() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0);
    for sub in ["state", "reload", "panic", "zone", "catalog", "direct", "lockdown"] {
        assert!(stdout.contains(sub), "help should mention '{sub}': {stdout}");
    }
}

#[test]
fn zone_subcommand_help_lists_element_operations() {
    let (code, stdout, _) = run(&["zone", "--help"]);
    assert_eq!(code, 0);
    for sub in ["add-interface", "add-port", "add-rich-rule", "set-default", "get-target"] {
        assert!(stdout.contains(sub), "zone help should mention '{sub}': {stdout}");
    }
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let (code, _, stderr) = run(&[]);
    assert_ne!(code, 0);
    assert!(!stderr.is_empty());
}

#[test]
fn lockdown_whitelist_uid_requires_a_value() {
    let (code, _, stderr) = run(&["lockdown", "whitelist-uid", "add"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("uid") || stderr.contains("required"), "stderr was: {stderr}");
}
