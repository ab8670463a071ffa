//! Final-stage messages derived from the session context
//!
//! [`refresh`] runs whenever the finish stage becomes active. It decides the
//! header, whether a merge dry-run is worth starting, and later folds the
//! dry-run plan into the text shown to the user.

use std::fmt;

use crate::analyze::{self, FailureKind, MergeCandidate};
use crate::classify::UpdatesByResult;
use crate::context::SessionContext;
use crate::plan::{MergePlan, MergeVerdict};

/// Headline of the finish stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishHeader {
    /// The fetch or planning operation itself failed
    Error,
    /// At least one reference failed to update
    UpdateFailed(FailureKind),
    /// References changed; merging may be needed
    Changed,
    NoChanges,
    /// Neither a result nor an error was recorded
    MissingInfo,
}

impl FinishHeader {
    /// Stable message key for UIs that localise text.
    pub fn key(&self) -> &'static str {
        match self {
            FinishHeader::Error => "reconcile.finish.headerError",
            FinishHeader::UpdateFailed(FailureKind::LockContention) => {
                "reconcile.finish.headerConcurrentProcess"
            }
            FinishHeader::UpdateFailed(FailureKind::Io) => "reconcile.finish.headerIoProblem",
            FinishHeader::UpdateFailed(FailureKind::Generic) => {
                "reconcile.finish.headerUpdateFailed"
            }
            FinishHeader::Changed => "reconcile.finish.headerChanged",
            FinishHeader::NoChanges => "reconcile.finish.headerNoChanges",
            FinishHeader::MissingInfo => "reconcile.finish.headerMissingInfo",
        }
    }

    /// Whether retrying the update could succeed without user action
    pub fn retry_may_help(&self) -> bool {
        matches!(self, FinishHeader::UpdateFailed(FailureKind::LockContention))
    }
}

impl fmt::Display for FinishHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FinishHeader::Error => "Updating from the remote repository failed.",
            FinishHeader::UpdateFailed(FailureKind::LockContention) => {
                "Another process is currently modifying the repository. \
                 Retrying the update may help."
            }
            FinishHeader::UpdateFailed(FailureKind::Io) => {
                "Could not write local references or reach the remote. \
                 Check access rights and network connectivity."
            }
            FinishHeader::UpdateFailed(FailureKind::Generic) => {
                "Updating failed for at least one reference."
            }
            FinishHeader::Changed => "The remote repository contained changes.",
            FinishHeader::NoChanges => "Your workspace is already up to date.",
            FinishHeader::MissingInfo => {
                "The update finished without reporting any information."
            }
        };
        f.write_str(text)
    }
}

/// What the finish stage shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishReport {
    pub header: FinishHeader,

    /// Raw result listing or error text
    pub detail: Option<String>,

    /// A merge dry-run is running
    pub dry_run_active: bool,

    pub plan: Option<MergePlan>,
}

impl FinishReport {
    fn new(header: FinishHeader, detail: Option<String>) -> Self {
        Self {
            header,
            detail,
            dry_run_active: false,
            plan: None,
        }
    }

    /// Full user-facing text.
    pub fn message(&self) -> String {
        let mut text = self.header.to_string();
        if self.dry_run_active {
            text.push_str("\n\nChecking whether the changes can be merged...");
        }
        if let Some(plan) = &self.plan {
            text.push_str("\n\n");
            text.push_str(&plan_summary(plan));
        }
        text
    }
}

/// Outcome of [`refresh`]: the report plus candidates that still need a dry-run.
#[derive(Debug)]
pub struct Refresh {
    pub report: FinishReport,
    pub candidates: Option<Vec<MergeCandidate>>,
}

/// Derive the finish report from the context.
///
/// An operation-level error short-circuits all result analysis. Failed
/// references take precedence over changed ones.
pub fn refresh(context: &SessionContext) -> Refresh {
    if let Some(error) = &context.error {
        let mut report = FinishReport::new(FinishHeader::Error, Some(error.to_string()));
        report.plan = context.merge_dry_run.clone();
        return Refresh {
            report,
            candidates: None,
        };
    }

    let Some(outcome) = &context.fetch_outcome else {
        let detail = context.final_message.clone();
        return Refresh {
            report: FinishReport::new(FinishHeader::MissingInfo, detail),
            candidates: None,
        };
    };

    tracing::info!(
        session = %context.id,
        remote = ?context.remote,
        "Raw result of fetching: {}",
        outcome
    );

    let grouped = UpdatesByResult::classify(&outcome.updates);

    if let Some(kind) = analyze::failure_kind(&grouped) {
        return Refresh {
            report: FinishReport::new(FinishHeader::UpdateFailed(kind), Some(outcome.to_string())),
            candidates: None,
        };
    }

    if !analyze::has_changed(&grouped) {
        return Refresh {
            report: FinishReport::new(FinishHeader::NoChanges, None),
            candidates: None,
        };
    }

    let mut report = FinishReport::new(FinishHeader::Changed, None);
    match &context.merge_dry_run {
        Some(plan) => {
            report.plan = Some(plan.clone());
            report.detail = context.merge_result.clone();
            Refresh {
                report,
                candidates: None,
            }
        }
        None => {
            report.dry_run_active = true;
            Refresh {
                report,
                candidates: Some(analyze::extract_merge_candidates(&grouped)),
            }
        }
    }
}

fn short_name(reference: &str) -> &str {
    reference
        .strip_prefix("refs/heads/")
        .or_else(|| reference.strip_prefix("refs/remotes/"))
        .unwrap_or(reference)
}

/// Human readable summary of a dry-run plan.
pub fn plan_summary(plan: &MergePlan) -> String {
    if plan.is_empty() {
        return "Only new references arrived; no existing branch needs to be merged.".to_string();
    }
    if plan.all_auto_mergeable() {
        return format!(
            "All {} updated branch(es) can be merged without conflicts.",
            plan.len()
        );
    }

    let mut lines = Vec::new();
    for entry in plan.with_verdict(MergeVerdict::Conflicted) {
        let branch = entry
            .local_ref
            .as_deref()
            .map(short_name)
            .unwrap_or_else(|| short_name(&entry.candidate.tracking_ref));
        match &entry.error {
            Some(error) => lines.push(format!(
                "Could not check '{}' for conflicts: {}",
                branch, error
            )),
            None => lines.push(format!(
                "Conflicts in the current branch '{}': {}",
                branch,
                entry.conflicts.join(", ")
            )),
        }
    }
    for entry in plan.with_verdict(MergeVerdict::Deferred) {
        let branch = entry.local_ref.as_deref().map(short_name).unwrap_or("?");
        lines.push(format!(
            "Conflicts in branch '{}' ({}); switch to it later to resolve them.",
            branch,
            entry.conflicts.join(", ")
        ));
    }
    let mergeable = plan.with_verdict(MergeVerdict::AutoMergeable).count();
    if mergeable > 0 {
        lines.push(format!(
            "{} other branch(es) can be merged without conflicts.",
            mergeable
        ));
    }
    lines.join("\n")
}
