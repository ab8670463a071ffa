//! Stages of the update workflow
//!
//! `ChooseRemote -> SelectScope -> Fetch -> Finish`. Each stage is a variant
//! of [`Stage`] carrying its own data; the workflow dispatches on it to
//! render, advance and enter stages.

use reconcile_git::FetchProgress;

use crate::context::{Scope, SessionContext};
use crate::message::FinishReport;
use crate::task::TaskHandle;

/// Identifier of a workflow stage, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    ChooseRemote,
    SelectScope,
    Fetch,
    Finish,
}

/// Title and description keys a UI uses to label a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub id: &'static str,
    pub title_key: &'static str,
    pub description_key: &'static str,
}

impl StageId {
    pub fn descriptor(&self) -> StageDescriptor {
        match self {
            StageId::ChooseRemote => StageDescriptor {
                id: "chooseRemote",
                title_key: "reconcile.chooseRemote.title",
                description_key: "reconcile.chooseRemote.description",
            },
            StageId::SelectScope => StageDescriptor {
                id: "selectScope",
                title_key: "reconcile.selectScope.title",
                description_key: "reconcile.selectScope.description",
            },
            StageId::Fetch => StageDescriptor {
                id: "update",
                title_key: "reconcile.update.title",
                description_key: "reconcile.update.description",
            },
            StageId::Finish => StageDescriptor {
                id: "finish",
                title_key: "reconcile.finish.title",
                description_key: "reconcile.finish.description",
            },
        }
    }

    /// Whether reaching this stage completes the workflow on `advance`
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageId::Finish)
    }
}

/// User input handed to a stage's `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageInput {
    /// A remote name or URL
    Remote(String),
    Scope(Scope),
    /// Accept the stage's default or move on once work is done
    Continue,
}

/// Result of a stage's `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Move on to the given stage
    Next(StageId),
    /// Validation failed or work is pending; stay on the current stage
    Stay(String),
    /// End the workflow without reaching completion
    Abort,
    /// The finish stage was accepted; the workflow completed
    Done,
}

/// Data a UI needs to draw the current stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageView {
    ChooseRemote {
        remotes: Vec<String>,
        default: Option<String>,
    },
    SelectScope {
        default: Scope,
    },
    Fetch {
        remote: Option<String>,
        running: bool,
        last_transfer: Option<FetchProgress>,
    },
    Finish {
        message: String,
        report: FinishReport,
    },
}

/// Live state of the active stage.
#[derive(Debug)]
pub(crate) enum Stage {
    ChooseRemote {
        remotes: Vec<String>,
        default: Option<String>,
    },
    SelectScope {
        default: Scope,
    },
    Fetch {
        task: Option<TaskHandle<SessionContext>>,
        last_transfer: Option<FetchProgress>,
    },
    Finish {
        report: FinishReport,
        dry_run: Option<TaskHandle<SessionContext>>,
    },
}

impl Stage {
    pub(crate) fn id(&self) -> StageId {
        match self {
            Stage::ChooseRemote { .. } => StageId::ChooseRemote,
            Stage::SelectScope { .. } => StageId::SelectScope,
            Stage::Fetch { .. } => StageId::Fetch,
            Stage::Finish { .. } => StageId::Finish,
        }
    }

    /// Background task owned by this stage, if one is still running.
    pub(crate) fn task_mut(&mut self) -> Option<&mut TaskHandle<SessionContext>> {
        match self {
            Stage::Fetch { task, .. } => task.as_mut(),
            Stage::Finish { dry_run, .. } => dry_run.as_mut(),
            _ => None,
        }
    }

    pub(crate) fn clear_task(&mut self) {
        match self {
            Stage::Fetch { task, .. } => *task = None,
            Stage::Finish { dry_run, .. } => *dry_run = None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_ids() {
        let ids: Vec<&str> = [
            StageId::ChooseRemote,
            StageId::SelectScope,
            StageId::Fetch,
            StageId::Finish,
        ]
        .iter()
        .map(|s| s.descriptor().id)
        .collect();
        assert_eq!(ids, vec!["chooseRemote", "selectScope", "update", "finish"]);
    }

    #[test]
    fn test_only_finish_is_terminal() {
        assert!(StageId::Finish.is_terminal());
        assert!(!StageId::Fetch.is_terminal());
    }
}
