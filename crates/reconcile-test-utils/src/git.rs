//! Git repository fixtures.
//!
//! All helpers panic on failure; they are meant for test setup only.

use std::fs;
use std::path::Path;
use std::process::Command;

/// Run `git` with `args` inside `path`, panicking with stderr on failure.
///
/// Returns trimmed stdout.
pub fn git(path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .unwrap_or_else(|e| panic!("git: failed to run `git {args:?}`: {e}"));
    if !output.status.success() {
        panic!(
            "git: `git {args:?}` failed in {}:\n{}",
            path.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Set identity and disable signing so commits work on any machine.
pub fn configure_identity(path: &Path) {
    git(path, &["config", "user.email", "test@test.com"]);
    git(path, &["config", "user.name", "Test User"]);
    git(path, &["config", "commit.gpgsign", "false"]);
}

/// Initialises a real git repository with an initial commit on `main`.
///
/// Specifically:
/// - Runs `git init -b main`
/// - Configures identity (see [`configure_identity`])
/// - Creates `README.md` and makes an initial commit
pub fn real_git_repo_with_commit(path: &Path) {
    git(path, &["init", "-b", "main"]);
    configure_identity(path);
    commit_file(path, "README.md", "# Test", "Initial commit");
}

/// Write `contents` to `file` (relative to `path`), stage it and commit.
///
/// Returns the new commit id as a hex string.
pub fn commit_file(path: &Path, file: &str, contents: &str, message: &str) -> String {
    let target = path.join(file);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("commit_file: failed to create {}: {e}", parent.display()));
    }
    fs::write(&target, contents)
        .unwrap_or_else(|e| panic!("commit_file: failed to write {}: {e}", target.display()));
    git(path, &["add", file]);
    git(path, &["commit", "-m", message]);
    head_id(path)
}

/// Commit id HEAD points at.
pub fn head_id(path: &Path) -> String {
    git(path, &["rev-parse", "HEAD"])
}
