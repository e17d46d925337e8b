//! End-to-end smoke tests for the binary. Nothing here talks to a
//! cluster; they exercise argument handling and local failure paths.

use assert_cmd::Command;
use predicates::prelude::*;

fn stratactl() -> Command {
    let mut cmd = Command::cargo_bin("stratactl").expect("binary builds");
    cmd.env_clear();
    cmd
}

#[test]
fn help_lists_the_command_groups() {
    stratactl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("project"))
        .stdout(predicate::str::contains("deployment"))
        .stdout(predicate::str::contains("session"))
        .stdout(predicate::str::contains("endpoint"));
}

#[test]
fn missing_hostname_is_a_clean_error() {
    stratactl()
        .args(["project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no hostname specified"));
}

#[test]
fn malformed_identifiers_fail_before_any_network_call() {
    stratactl()
        .args([
            "project",
            "info",
            "a/b/c/d",
            "--hostname",
            "strata.invalid",
            "--username",
            "alice",
            "--no-persist",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid project identifier"));
}

#[test]
fn malformed_filters_are_rejected() {
    stratactl()
        .args([
            "project",
            "list",
            "--filter",
            "nonsense",
            "--hostname",
            "strata.invalid",
            "--username",
            "alice",
            "--no-persist",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid filter"));
}
