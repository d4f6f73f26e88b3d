use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn integration_enabled() -> bool {
    std::env::var("TIDYREV_INTEGRATION").is_ok()
}

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("tidyrev").unwrap()
}

// --- Help & version ---

#[test]
fn help_flag() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("clang-tidy"));
}

#[test]
fn version_flag() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tidyrev"));
}

// --- Clap errors ---

#[test]
fn unknown_flag_rejected() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .arg("--bogus")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn non_numeric_pr_rejected() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .args(["--repo", "o/r", "--pr", "abc"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid value"));
}

// --- Config validation ---

#[test]
fn missing_repo_rejected() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .args(["--pr", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("owner/name"));
}

#[test]
fn missing_pr_rejected() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .args(["--repo", "o/r"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("pr number must be > 0"));
}

#[test]
fn malformed_repo_rejected() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .args(["--repo", "norepo", "--pr", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("owner/name"));
}

// --- Config file errors ---

#[test]
fn config_file_not_found() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .args(["--repo", "o/r", "--pr", "1", "--config", "/nonexistent.toml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn invalid_toml_config() {
    if !integration_enabled() {
        return;
    }
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("tidyrev.toml");
    fs::write(&path, "not valid {{{{ toml").unwrap();
    cmd()
        .args(["--repo", "o/r", "--pr", "1", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn unknown_config_field_rejected() {
    if !integration_enabled() {
        return;
    }
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("tidyrev.toml");
    fs::write(&path, "bogus = true\n").unwrap();
    cmd()
        .args(["--repo", "o/r", "--pr", "1", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown field"));
}
