//! Merge necessity analysis over classified fetch results

use reconcile_git::{Oid, RefUpdate, RefUpdateResult};

use crate::classify::{Partition, UpdatesByResult};

/// True iff any occurred result code is in the Failed partition.
pub fn has_failed(updates: &UpdatesByResult) -> bool {
    updates
        .results()
        .any(|r| Partition::of(r) == Partition::Failed)
}

/// True iff any occurred result code is in the Changed partition.
pub fn has_changed(updates: &UpdatesByResult) -> bool {
    updates
        .results()
        .any(|r| Partition::of(r) == Partition::Changed)
}

/// Which failure message applies when at least one reference failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Another process held a reference lock; retrying may help
    LockContention,
    /// Filesystem or network trouble; check access and connectivity
    Io,
    /// Anything else
    Generic,
}

/// Pick the failure message variant. Lock contention beats I/O, which beats generic.
///
/// Returns `None` when nothing failed.
pub fn failure_kind(updates: &UpdatesByResult) -> Option<FailureKind> {
    if !has_failed(updates) {
        return None;
    }
    if updates.contains(RefUpdateResult::LockFailure) {
        Some(FailureKind::LockContention)
    } else if updates.contains(RefUpdateResult::IoFailure) {
        Some(FailureKind::Io)
    } else {
        Some(FailureKind::Generic)
    }
}

/// A tracking reference whose content really changed and may need a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCandidate {
    /// Local tracking reference, e.g. `refs/remotes/origin/main`
    pub tracking_ref: String,
    pub old_id: Oid,
    pub new_id: Oid,
}

impl MergeCandidate {
    /// Build a candidate, or `None` when the update is trivially safe:
    /// previously absent, unchanged, or a deletion.
    pub fn from_update(update: &RefUpdate) -> Option<Self> {
        if update.old_id.is_zero() || update.old_id == update.new_id || update.new_id.is_zero() {
            return None;
        }
        Some(Self {
            tracking_ref: update.local_name.clone(),
            old_id: update.old_id,
            new_id: update.new_id,
        })
    }
}

/// All records under Changed codes, in the order the fetch reported them.
pub fn changed_updates(updates: &UpdatesByResult) -> Vec<&RefUpdate> {
    updates.in_partition(Partition::Changed).collect()
}

/// Changed records that carry a non-trivial content change.
pub fn extract_merge_candidates(updates: &UpdatesByResult) -> Vec<MergeCandidate> {
    changed_updates(updates)
        .into_iter()
        .filter_map(MergeCandidate::from_update)
        .collect()
}
