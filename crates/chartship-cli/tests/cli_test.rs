use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn chartship() -> assert_cmd::Command {
    cargo_bin_cmd!("chartship")
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
        .status;
    assert!(status.success(), "git {args:?} failed");
}

// ── Help / Version ──

#[test]
fn shows_help() {
    chartship()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("publish Helm charts"))
        .stdout(predicate::str::contains("--image-prefix"));
}

#[test]
fn shows_version() {
    chartship()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("chartship"));
}

#[test]
fn build_help_lists_flags() {
    chartship()
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--commit-range"))
        .stdout(predicate::str::contains("--push"));
}

#[test]
fn requires_subcommand() {
    chartship().assert().failure();
}

#[test]
fn rejects_unknown_subcommand() {
    chartship()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ── Build Command ──

#[test]
fn build_fails_on_non_git_directory() {
    let tmp = TempDir::new().unwrap();

    chartship()
        .args(["--image-prefix", "acme/k8s-", "build"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("image stage failed"))
        .stderr(predicate::str::contains("git"));
}

#[test]
fn build_fails_on_missing_project_dir() {
    let tmp = TempDir::new().unwrap();

    chartship()
        .arg("-C")
        .arg(tmp.path().join("missing"))
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open project"));
}

#[test]
fn build_fails_on_invalid_config() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("chartship.toml"),
        "[chart]\nimage = \"nope\"\n",
    )
    .unwrap();

    chartship()
        .arg("--project-dir")
        .arg(tmp.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}

#[test]
fn build_fails_on_invalid_commit_range() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    git(dir, &["init", "-q"]);
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    std::fs::write(dir.join("setup.py"), "setup()\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", "init"]);

    chartship()
        .current_dir(dir)
        .args(["build", "--commit-range", "no-such-ref..HEAD"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("change detection"))
        .stderr(predicate::str::contains("no-such-ref..HEAD"));
}
