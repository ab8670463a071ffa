//! Session context threaded through the update workflow

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reconcile_git::{FetchOutcome, Oid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;
use crate::plan::MergePlan;

/// Which branches an update reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only the checked-out branch
    #[default]
    Workspace,

    /// Every branch covered by the remote's fetch ref-specs
    Workflow,
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "workspace" | "branch" | "current" => Ok(Scope::Workspace),
            "workflow" | "all" => Ok(Scope::Workflow),
            _ => Err(Error::InvalidScope {
                scope: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Workspace => write!(f, "workspace"),
            Scope::Workflow => write!(f, "workflow"),
        }
    }
}

/// Mutable state of one workflow run.
///
/// Owned by exactly one side at a time: the workflow while a stage is
/// interactive, a background task while fetching or probing merges.
#[derive(Debug)]
pub struct SessionContext {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Configured remote name chosen by the user
    pub remote: Option<String>,
    pub scope: Scope,

    /// Branch checked out when the fetch started
    pub branch: Option<String>,

    /// HEAD before the update, kept so callers can report or restore it
    pub current_head: Option<Oid>,

    pub fetch_outcome: Option<FetchOutcome>,

    /// Set when the fetch or planning operation itself failed
    pub error: Option<Error>,

    pub merge_dry_run: Option<MergePlan>,

    /// Outcome of merges applied after the dry-run. The update never merges
    /// by itself; front ends that do record the result here.
    pub merge_result: Option<String>,

    /// Free text shown when nothing more specific is available
    pub final_message: Option<String>,
}

impl SessionContext {
    pub fn new(scope: Scope) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            remote: None,
            scope,
            branch: None,
            current_head: None,
            fetch_outcome: None,
            error: None,
            merge_dry_run: None,
            merge_result: None,
            final_message: None,
        }
    }

    /// Replacement for a context lost inside a failed background task.
    pub(crate) fn recovered(id: Uuid, remote: Option<String>, scope: Scope, error: Error) -> Self {
        Self {
            id,
            remote,
            error: Some(error),
            ..Self::new(scope)
        }
    }

    /// Remote name, or [`Error::NoRemoteSelected`].
    pub fn require_remote(&self) -> crate::Result<&str> {
        self.remote.as_deref().ok_or(Error::NoRemoteSelected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("workspace", Scope::Workspace)]
    #[case("Branch", Scope::Workspace)]
    #[case("workflow", Scope::Workflow)]
    #[case(" ALL ", Scope::Workflow)]
    fn test_scope_from_str(#[case] input: &str, #[case] expected: Scope) {
        assert_eq!(input.parse::<Scope>().unwrap(), expected);
    }

    #[test]
    fn test_scope_from_str_invalid() {
        let err = "everything".parse::<Scope>().unwrap_err();
        assert!(err.to_string().contains("everything"));
    }

    #[test]
    fn test_scope_display_round_trips() {
        for scope in [Scope::Workspace, Scope::Workflow] {
            assert_eq!(scope.to_string().parse::<Scope>().unwrap(), scope);
        }
    }

    #[test]
    fn test_new_context_is_empty() {
        let ctx = SessionContext::new(Scope::Workflow);
        assert_eq!(ctx.scope, Scope::Workflow);
        assert!(ctx.remote.is_none());
        assert!(matches!(ctx.require_remote(), Err(Error::NoRemoteSelected)));
    }
}
