//! Remote client trait and the records it produces

use std::collections::BTreeMap;
use std::fmt;

use git2::Oid;

use crate::Result;
use crate::refspec::RefSpec;

/// Outcome of updating a single local tracking reference during a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefUpdateResult {
    /// The update was never tried
    NotAttempted,
    /// The reference already pointed at the fetched object
    NoChange,
    /// The reference did not exist before
    New,
    /// The reference moved to a descendant of its old value
    FastForward,
    /// The reference was overwritten with a non-descendant
    Forced,
    /// The reference was renamed
    Renamed,
    /// Another process holds the reference lock
    LockFailure,
    /// Writing the reference failed at the filesystem level
    IoFailure,
    /// A non-fast-forward update without force
    Rejected,
    /// The update would move the checked-out branch
    RejectedCurrentBranch,
    /// The fetched object is missing from the object database
    RejectedMissingObject,
    /// Rejected for a reason not covered above
    RejectedOtherReason,
}

impl RefUpdateResult {
    /// Every result code, in declaration order.
    pub const ALL: [RefUpdateResult; 12] = [
        RefUpdateResult::NotAttempted,
        RefUpdateResult::NoChange,
        RefUpdateResult::New,
        RefUpdateResult::FastForward,
        RefUpdateResult::Forced,
        RefUpdateResult::Renamed,
        RefUpdateResult::LockFailure,
        RefUpdateResult::IoFailure,
        RefUpdateResult::Rejected,
        RefUpdateResult::RejectedCurrentBranch,
        RefUpdateResult::RejectedMissingObject,
        RefUpdateResult::RejectedOtherReason,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefUpdateResult::NotAttempted => "NOT_ATTEMPTED",
            RefUpdateResult::NoChange => "NO_CHANGE",
            RefUpdateResult::New => "NEW",
            RefUpdateResult::FastForward => "FAST_FORWARD",
            RefUpdateResult::Forced => "FORCED",
            RefUpdateResult::Renamed => "RENAMED",
            RefUpdateResult::LockFailure => "LOCK_FAILURE",
            RefUpdateResult::IoFailure => "IO_FAILURE",
            RefUpdateResult::Rejected => "REJECTED",
            RefUpdateResult::RejectedCurrentBranch => "REJECTED_CURRENT_BRANCH",
            RefUpdateResult::RejectedMissingObject => "REJECTED_MISSING_OBJECT",
            RefUpdateResult::RejectedOtherReason => "REJECTED_OTHER_REASON",
        }
    }
}

impl fmt::Display for RefUpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracking reference touched by a fetch.
///
/// `old_id` is [`Oid::zero`] when the reference did not exist before,
/// `new_id` is zero for a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    /// Reference name on the remote side (e.g. `refs/heads/main`)
    pub remote_name: String,

    /// Local tracking reference that was updated (e.g. `refs/remotes/origin/main`)
    pub local_name: String,

    pub old_id: Oid,
    pub new_id: Oid,
    pub result: RefUpdateResult,
}

impl RefUpdate {
    pub fn new(
        remote_name: impl Into<String>,
        local_name: impl Into<String>,
        old_id: Oid,
        new_id: Oid,
        result: RefUpdateResult,
    ) -> Self {
        Self {
            remote_name: remote_name.into(),
            local_name: local_name.into(),
            old_id,
            new_id,
            result,
        }
    }
}

impl fmt::Display for RefUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}..{} {}",
            self.local_name,
            short(self.old_id),
            short(self.new_id),
            self.result
        )
    }
}

fn short(id: Oid) -> String {
    let full = id.to_string();
    full[..7.min(full.len())].to_string()
}

/// Everything a fetch reports back, in the order references were processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// URL the objects were fetched from
    pub uri: String,

    pub updates: Vec<RefUpdate>,
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "From {}", self.uri)?;
        for update in &self.updates {
            write!(f, "\n  {}", update)?;
        }
        Ok(())
    }
}

/// Parameters for a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub remote: String,
    pub refspecs: Vec<RefSpec>,

    /// Verify every fetched object is present before moving a reference
    pub check_objects: bool,
}

/// Transfer statistics reported while a fetch downloads objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchProgress {
    pub received_objects: usize,
    pub indexed_objects: usize,
    pub total_objects: usize,
    pub received_bytes: usize,
}

/// A remote tracking reference and the local branch that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefPair {
    /// e.g. `refs/remotes/origin/main`
    pub remote_ref: String,
    /// e.g. `refs/heads/main`
    pub local_ref: String,
}

/// Result of a non-mutating three-way merge probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeProbe {
    Clean,
    Conflicted { paths: Vec<String> },
}

/// Tracking status classes that block an update of the local workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileStatus {
    Modified,
    Corrupted,
    Missing,
    Unknown,
}

impl FileStatus {
    pub fn title(&self) -> &'static str {
        match self {
            FileStatus::Modified => "Modified",
            FileStatus::Corrupted => "Corrupted",
            FileStatus::Missing => "Missing",
            FileStatus::Unknown => "Unknown",
        }
    }
}

/// File counts per blocking status. Statuses with no files are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceStatus {
    pub counts: BTreeMap<FileStatus, usize>,
    /// Paths behind each count, relative to the working directory
    pub paths: BTreeMap<FileStatus, Vec<String>>,
}

impl WorkspaceStatus {
    pub fn is_clean(&self) -> bool {
        self.counts.values().all(|&count| count == 0)
    }

    pub fn record(&mut self, status: FileStatus, path: impl Into<String>) {
        *self.counts.entry(status).or_insert(0) += 1;
        self.paths.entry(status).or_default().push(path.into());
    }

    /// Drop `path` from every status it was recorded under.
    pub fn forget(&mut self, path: &str) {
        for (status, paths) in &mut self.paths {
            let before = paths.len();
            paths.retain(|p| p != path);
            let removed = before - paths.len();
            if let Some(count) = self.counts.get_mut(status) {
                *count = count.saturating_sub(removed);
            }
        }
        self.counts.retain(|_, count| *count > 0);
        self.paths.retain(|_, paths| !paths.is_empty());
    }
}

/// Everything the reconcile workflow needs from a version-control client.
///
/// Implementations must be shareable with worker threads; the git2 backend
/// opens a fresh repository handle per call.
pub trait RemoteClient: Send + Sync {
    /// Names of all configured remotes
    fn remote_names(&self) -> Result<Vec<String>>;

    /// Resolve a remote name or URL to a configured remote name.
    fn resolve_remote(&self, identifier: &str) -> Result<Option<String>>;

    /// Fetch ref-specs configured for `remote`, in declaration order
    fn configured_fetch_refspecs(&self, remote: &str) -> Result<Vec<RefSpec>>;

    /// Short name of the checked-out branch
    fn current_branch_name(&self) -> Result<String>;

    /// Commit HEAD points at, or `None` on an unborn branch
    fn head_id(&self) -> Result<Option<Oid>>;

    /// Object a reference points at, or `None` if it does not exist
    fn reference_id(&self, name: &str) -> Result<Option<Oid>>;

    /// Download objects and update tracking references.
    ///
    /// `progress` is called while objects transfer; returning `false` aborts
    /// the fetch with [`crate::Error::Cancelled`].
    fn fetch(
        &self,
        request: &FetchRequest,
        progress: &mut dyn FnMut(&FetchProgress) -> bool,
    ) -> Result<FetchOutcome>;

    /// Expand ref-specs into (tracking ref, local branch) pairs, spec order first.
    fn resolve_reference_pairs(&self, refspecs: &[RefSpec]) -> Result<Vec<RefPair>>;

    /// Probe a three-way merge of `theirs` into `ours` without touching refs or the worktree.
    fn merge_dry_run(&self, ours: Oid, theirs: Oid) -> Result<MergeProbe>;

    /// Count files in the working tree that would block an update
    fn workspace_status(&self) -> Result<WorkspaceStatus>;
}
