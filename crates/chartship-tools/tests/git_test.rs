//! History queries against real repositories built with the git CLI.

use chartship_tools::{GitError, ToolClient};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_owned()
}

fn init_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    git(tmp.path(), &["init", "-q"]);
    git(tmp.path(), &["config", "user.email", "test@test.com"]);
    git(tmp.path(), &["config", "user.name", "Test"]);
    git(tmp.path(), &["config", "commit.gpgsign", "false"]);
    tmp
}

/// Write `path` and commit it, returning the short hash.
fn commit_file(dir: &Path, path: &str, content: &str) -> String {
    let file = dir.join(path);
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, content).unwrap();
    git(dir, &["add", path]);
    git(dir, &["commit", "-q", "-m", &format!("update {path}")]);
    git(dir, &["log", "-n", "1", "--pretty=format:%h"])
}

fn root(tmp: &TempDir) -> PathBuf {
    tmp.path().canonicalize().unwrap()
}

#[tokio::test]
async fn changed_false_when_range_touches_other_paths() {
    let tmp = init_repo();
    let dir = root(&tmp);
    let base = commit_file(&dir, "chart/values.yaml", "a: 1\n");
    commit_file(&dir, "docs/index.md", "hello\n");

    let client = ToolClient::new();
    let changed = client
        .path_changed(&dir, &[dir.join("chart")], &format!("{base}..HEAD"))
        .await
        .unwrap();

    assert!(!changed);
}

#[tokio::test]
async fn changed_true_when_range_touches_path() {
    let tmp = init_repo();
    let dir = root(&tmp);
    let base = commit_file(&dir, "chart/values.yaml", "a: 1\n");
    commit_file(&dir, "chart/values.yaml", "a: 2\n");

    let client = ToolClient::new();
    let changed = client
        .path_changed(
            &dir,
            &[dir.join("docs"), dir.join("chart")],
            &format!("{base}..HEAD"),
        )
        .await
        .unwrap();

    assert!(changed);
}

#[tokio::test]
async fn changed_fails_on_invalid_range() {
    let tmp = init_repo();
    let dir = root(&tmp);
    commit_file(&dir, "a.txt", "a\n");

    let client = ToolClient::new();
    let result = client
        .path_changed(&dir, &[dir.join("a.txt")], "no-such-ref..HEAD")
        .await;

    assert!(matches!(result, Err(GitError::Diff { .. })));
}

#[tokio::test]
async fn last_modified_returns_latest_commit_regardless_of_path_order() {
    let tmp = init_repo();
    let dir = root(&tmp);
    let first = commit_file(&dir, "image/Dockerfile", "FROM scratch\n");
    let second = commit_file(&dir, "pkg/setup.py", "setup()\n");
    assert_ne!(first, second);

    let client = ToolClient::new();
    let forward = client
        .last_modified(&dir, &[dir.join("image"), dir.join("pkg")])
        .await
        .unwrap();
    let backward = client
        .last_modified(&dir, &[dir.join("pkg"), dir.join("image")])
        .await
        .unwrap();
    let only_image = client
        .last_modified(&dir, &[dir.join("image")])
        .await
        .unwrap();

    assert_eq!(forward, second);
    assert_eq!(backward, second);
    assert_eq!(only_image, first);
}

#[tokio::test]
async fn last_modified_fails_on_empty_history() {
    let tmp = init_repo();
    let dir = root(&tmp);

    let client = ToolClient::new();
    let result = client.last_modified(&dir, &[dir.clone()]).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn last_modified_fails_when_no_commit_touches_paths() {
    let tmp = init_repo();
    let dir = root(&tmp);
    commit_file(&dir, "a.txt", "a\n");

    let client = ToolClient::new();
    let result = client.last_modified(&dir, &[dir.join("missing")]).await;

    assert!(matches!(result, Err(GitError::NoCommits { .. })));
}
