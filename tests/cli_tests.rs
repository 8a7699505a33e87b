//! Integration tests for CLI

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_cli_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-md"));
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("repo-md"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-md"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Clone a repository"))
        .stdout(predicate::str::contains("--clean_dir"))
        .stdout(predicate::str::contains("--clone_dir"))
        .stdout(predicate::str::contains("--max_mb"))
        .stdout(predicate::str::contains("--extensions"));
}

#[test]
fn test_requires_repo_url() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-md"));
    cmd.assert().failure().stderr(predicate::str::contains("REPO_URL"));
}

#[test]
fn test_rejects_invalid_url() {
    let work = TempDir::new().expect("temp dir");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-md"));
    cmd.current_dir(work.path());
    cmd.args(["ftp://example.com/repo.git", "--clone_dir", "clone"]);
    cmd.assert().failure().stderr(predicate::str::contains("invalid repository URL"));
    assert!(!work.path().join("clone").exists());
}

#[test]
fn test_rejects_non_numeric_max_mb() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-md"));
    cmd.args(["https://github.com/org/repo.git", "--max_mb", "ten"]);
    cmd.assert().failure().stderr(predicate::str::contains("--max_mb"));
}

#[test]
fn test_unreachable_remote_exits_nonzero() {
    let work = TempDir::new().expect("temp dir");
    let missing = work.path().join("missing.git");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repo-md"));
    cmd.current_dir(work.path());
    cmd.args([format!("file://{}", missing.display()).as_str(), "--clone_dir", "clone"]);
    cmd.assert().failure().stderr(predicate::str::contains("failed to clone"));
    assert!(!work.path().join("clone").exists());
}
