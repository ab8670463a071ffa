//! Shared git2 helper functions for the remote client
//!
//! These functions encapsulate git2 patterns used by the fetch and probe paths.

use git2::{ErrorClass, ErrorCode, Oid, Repository, Status, StatusOptions};

use crate::client::{FileStatus, MergeProbe, RefUpdateResult, WorkspaceStatus};
use crate::{Error, Result};

/// Get the current branch name from a repository.
///
/// Returns the branch name if HEAD points to a branch, or `None` if HEAD is detached.
/// An unborn branch (no commits yet) is reported by its configured name.
pub fn get_current_branch(repo: &Repository) -> Result<Option<String>> {
    let head = match repo.head() {
        Ok(head) => head,
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            let target = repo.find_reference("HEAD")?;
            return Ok(target
                .symbolic_target()
                .and_then(|t| t.strip_prefix("refs/heads/"))
                .map(str::to_string));
        }
        Err(e) => return Err(e.into()),
    };

    if head.is_branch() {
        Ok(Some(head.shorthand().unwrap_or("HEAD").to_string()))
    } else {
        Ok(None)
    }
}

/// Look up what a reference points at, treating "not found" as `None`.
pub fn reference_target(repo: &Repository, name: &str) -> Result<Option<Oid>> {
    match repo.refname_to_id(name) {
        Ok(id) => Ok(Some(id)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Map a failed reference write onto a fetch result code.
pub fn classify_ref_error(error: &git2::Error) -> RefUpdateResult {
    if error.code() == ErrorCode::Locked {
        return RefUpdateResult::LockFailure;
    }
    match error.class() {
        ErrorClass::Os | ErrorClass::Filesystem => RefUpdateResult::IoFailure,
        ErrorClass::Odb | ErrorClass::Object => RefUpdateResult::RejectedMissingObject,
        _ => RefUpdateResult::RejectedOtherReason,
    }
}

/// Decide the result code for moving `local_name` from `old` to `new`,
/// before the reference is written.
pub fn plan_ref_update(
    repo: &Repository,
    local_name: &str,
    old: Option<Oid>,
    new: Oid,
    force: bool,
    check_objects: bool,
    checked_out: Option<&str>,
) -> RefUpdateResult {
    if old == Some(new) {
        return RefUpdateResult::NoChange;
    }

    if check_objects && repo.find_object(new, None).is_err() {
        return RefUpdateResult::RejectedMissingObject;
    }

    if checked_out == Some(local_name) && !repo.is_bare() {
        return RefUpdateResult::RejectedCurrentBranch;
    }

    let Some(old) = old else {
        return RefUpdateResult::New;
    };

    match repo.graph_descendant_of(new, old) {
        Ok(true) => RefUpdateResult::FastForward,
        Ok(false) if force => RefUpdateResult::Forced,
        Ok(false) => RefUpdateResult::Rejected,
        Err(e) => {
            tracing::warn!(
                reference = %local_name,
                error = %e,
                "Could not compare old and new reference targets"
            );
            RefUpdateResult::RejectedMissingObject
        }
    }
}

/// Probe a merge of `theirs` into `ours` in memory.
pub fn probe_merge(repo: &Repository, ours: Oid, theirs: Oid) -> Result<MergeProbe> {
    if ours == theirs || repo.graph_descendant_of(ours, theirs)? {
        return Ok(MergeProbe::Clean);
    }

    let ours_commit = repo.find_commit(ours)?;
    let theirs_commit = repo.find_commit(theirs)?;
    let index = repo.merge_commits(&ours_commit, &theirs_commit, None)?;

    if !index.has_conflicts() {
        return Ok(MergeProbe::Clean);
    }

    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
        if let Some(entry) = entry {
            paths.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    paths.sort();
    paths.dedup();

    Ok(MergeProbe::Conflicted { paths })
}

/// Count working tree files whose status blocks an update.
pub fn collect_workspace_status(repo: &Repository) -> Result<WorkspaceStatus> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let mut status = WorkspaceStatus::default();
    for entry in repo.statuses(Some(&mut opts))?.iter() {
        if let Some(kind) = classify_status(entry.status()) {
            status.record(kind, entry.path().unwrap_or_default());
        }
    }

    Ok(status)
}

fn classify_status(status: Status) -> Option<FileStatus> {
    if status.is_conflicted() {
        Some(FileStatus::Corrupted)
    } else if status.is_wt_deleted() {
        Some(FileStatus::Missing)
    } else if status.is_wt_new() {
        Some(FileStatus::Unknown)
    } else if status.intersects(
        Status::WT_MODIFIED
            | Status::WT_TYPECHANGE
            | Status::WT_RENAMED
            | Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE,
    ) {
        Some(FileStatus::Modified)
    } else {
        None
    }
}

/// Convert a download error, mapping an aborted transfer to [`Error::Cancelled`].
pub fn download_error(error: git2::Error) -> Error {
    if error.code() == ErrorCode::User {
        Error::Cancelled
    } else {
        Error::Git(error)
    }
}
