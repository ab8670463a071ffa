//! Upstream/clone fixture for fetch tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::git::{commit_file, configure_identity, git, real_git_repo_with_commit};

/// An upstream repository and a clone of it that tracks `origin`.
///
/// Layout inside one temporary directory:
/// - `upstream/`: non-bare repository acting as the remote
/// - `local/`: clone with `origin` pointing at `upstream/`
pub struct RemotePair {
    _temp: TempDir,
    upstream: PathBuf,
    local: PathBuf,
}

impl RemotePair {
    /// Create an upstream with one commit on `main` and clone it.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap_or_else(|e| panic!("RemotePair: tempdir: {e}"));
        let upstream = temp.path().join("upstream");
        let local = temp.path().join("local");
        std::fs::create_dir_all(&upstream)
            .unwrap_or_else(|e| panic!("RemotePair: failed to create upstream: {e}"));

        real_git_repo_with_commit(&upstream);
        // Let clones receive pushes to the checked-out branch in tests that need it
        git(&upstream, &["config", "receive.denyCurrentBranch", "ignore"]);

        let upstream_str = upstream.to_string_lossy().to_string();
        let local_str = local.to_string_lossy().to_string();
        git(temp.path(), &["clone", &upstream_str, &local_str]);
        configure_identity(&local);

        Self {
            _temp: temp,
            upstream,
            local,
        }
    }

    pub fn upstream(&self) -> &Path {
        &self.upstream
    }

    pub fn local(&self) -> &Path {
        &self.local
    }

    /// Commit a file in the upstream repository on its current branch.
    pub fn commit_upstream(&self, file: &str, contents: &str, message: &str) -> String {
        commit_file(&self.upstream, file, contents, message)
    }

    /// Commit a file in the local clone on its current branch.
    pub fn commit_local(&self, file: &str, contents: &str, message: &str) -> String {
        commit_file(&self.local, file, contents, message)
    }

    /// Create a branch in upstream at its HEAD, leaving `main` checked out.
    pub fn branch_upstream(&self, name: &str) {
        git(&self.upstream, &["branch", name]);
    }

    /// Check out `name` in upstream, creating nothing.
    pub fn checkout_upstream(&self, name: &str) {
        git(&self.upstream, &["checkout", name]);
    }
}

impl Default for RemotePair {
    fn default() -> Self {
        Self::new()
    }
}
