//! Pre-update check of the local working tree
//!
//! An update must not start while files are modified, conflicted, missing or
//! untracked, since merging into such a tree could lose work. The settings
//! file is exempt so it can stay uncommitted.

use std::sync::Arc;

use reconcile_git::{RemoteClient, WorkspaceStatus};
use tokio::runtime::Handle;

use crate::Result;
use crate::settings::SETTINGS_FILE;
use crate::task::{self, TaskHandle};

/// Result of inspecting the working tree before an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceCheck {
    pub status: WorkspaceStatus,
}

impl WorkspaceCheck {
    /// Whether the update can proceed
    pub fn is_ready(&self) -> bool {
        self.status.is_clean()
    }

    /// One `Status: count` line per blocking status, empty when ready.
    pub fn summary(&self) -> String {
        self.status
            .counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(status, count)| format!("{}: {}", status.title(), count))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// User-facing message describing the check outcome
    pub fn message(&self) -> String {
        if self.is_ready() {
            "The workspace has no local changes and is ready for an update.".to_string()
        } else {
            format!(
                "The workspace has local changes that must be recorded or discarded \
                 before updating:\n{}",
                self.summary()
            )
        }
    }
}

/// Inspect the working tree synchronously.
pub fn check_workspace(client: &dyn RemoteClient) -> Result<WorkspaceCheck> {
    let mut status = client.workspace_status()?;
    status.forget(SETTINGS_FILE);
    tracing::info!(counts = ?status.counts, "Pre-update workspace check done");
    Ok(WorkspaceCheck { status })
}

/// Inspect the working tree on the blocking pool.
pub fn spawn_workspace_check(
    runtime: &Handle,
    client: Arc<dyn RemoteClient>,
) -> TaskHandle<WorkspaceCheck> {
    task::spawn(runtime, move |reporter| {
        reporter.status("Checking workspace for local changes");
        check_workspace(client.as_ref())
    })
}
