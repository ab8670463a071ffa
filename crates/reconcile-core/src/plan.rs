//! Merge feasibility planning
//!
//! Probes every merge candidate against the local branch that follows it and
//! tags it auto-mergeable, conflicted (checked-out branch) or deferred
//! (conflict in another branch). The planner only reads the repository.

use std::collections::HashMap;

use reconcile_git::{MergeProbe, RefPair, RefSpec, RemoteClient};

use crate::analyze::MergeCandidate;
use crate::context::Scope;
use crate::task::{CancelToken, Progress};
use crate::Result;

/// Verdict for a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeVerdict {
    /// Merges without conflicts (or there is nothing local to merge into)
    AutoMergeable,
    /// Conflicts in the checked-out branch, or the probe itself failed
    Conflicted,
    /// Conflicts in a branch that is not checked out; resolve after switching
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlanEntry {
    pub candidate: MergeCandidate,

    /// Local branch that follows the tracking reference, if any
    pub local_ref: Option<String>,

    pub verdict: MergeVerdict,

    /// Conflicting paths reported by the probe
    pub conflicts: Vec<String>,

    /// Probe error, when the verdict comes from a failure rather than a conflict
    pub error: Option<String>,
}

/// One entry per candidate, in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub entries: Vec<MergePlanEntry>,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn with_verdict(&self, verdict: MergeVerdict) -> impl Iterator<Item = &MergePlanEntry> {
        self.entries.iter().filter(move |e| e.verdict == verdict)
    }

    pub fn all_auto_mergeable(&self) -> bool {
        self.entries
            .iter()
            .all(|e| e.verdict == MergeVerdict::AutoMergeable)
    }
}

/// Ref-specs that bound an update for `scope`.
///
/// Workspace scope narrows the configured specs to the checked-out branch;
/// workflow scope uses them as declared.
pub fn scope_refspecs(
    configured: &[RefSpec],
    remote: &str,
    scope: Scope,
    branch: &str,
) -> Vec<RefSpec> {
    let fallback = || {
        RefSpec::single(
            true,
            format!("refs/heads/{branch}"),
            format!("refs/remotes/{remote}/{branch}"),
        )
    };

    match scope {
        Scope::Workspace => {
            let source = format!("refs/heads/{branch}");
            let narrowed = configured
                .iter()
                .find_map(|spec| spec.expand_for(&source))
                .unwrap_or_else(fallback);
            vec![narrowed]
        }
        Scope::Workflow if configured.is_empty() => vec![RefSpec::single(
            true,
            "refs/heads/*",
            format!("refs/remotes/{remote}/*"),
        )],
        Scope::Workflow => configured.to_vec(),
    }
}

/// Dry-run evaluator over a set of merge candidates.
pub struct MergePlanner<'a> {
    client: &'a dyn RemoteClient,
    refspecs: Vec<RefSpec>,
    current_branch: String,
}

impl<'a> MergePlanner<'a> {
    pub fn new(
        client: &'a dyn RemoteClient,
        refspecs: Vec<RefSpec>,
        current_branch: impl Into<String>,
    ) -> Self {
        Self {
            client,
            refspecs,
            current_branch: current_branch.into(),
        }
    }

    /// Evaluate each candidate in order.
    ///
    /// Checks `cancel` before every pair. A failing probe marks that pair
    /// conflicted and evaluation continues; only pair discovery failing, or
    /// cancellation, ends planning early.
    pub fn plan(
        &self,
        candidates: &[MergeCandidate],
        cancel: &CancelToken,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<MergePlan> {
        cancel.check()?;
        let pairs = self.client.resolve_reference_pairs(&self.refspecs)?;
        let locals: HashMap<&str, &str> = pairs
            .iter()
            .map(|RefPair { remote_ref, local_ref }| (remote_ref.as_str(), local_ref.as_str()))
            .collect();
        let checked_out = format!("refs/heads/{}", self.current_branch);

        let total = candidates.len();
        let mut entries = Vec::with_capacity(total);

        for (index, candidate) in candidates.iter().enumerate() {
            cancel.check()?;

            let local_ref = locals
                .get(candidate.tracking_ref.as_str())
                .map(|s| s.to_string());
            let entry = self.evaluate(candidate, local_ref, &checked_out);

            tracing::debug!(
                reference = %candidate.tracking_ref,
                verdict = ?entry.verdict,
                "Evaluated merge candidate"
            );
            progress(Progress::Evaluated {
                done: index + 1,
                total,
                reference: candidate.tracking_ref.clone(),
            });
            entries.push(entry);
        }

        Ok(MergePlan { entries })
    }

    fn evaluate(
        &self,
        candidate: &MergeCandidate,
        local_ref: Option<String>,
        checked_out: &str,
    ) -> MergePlanEntry {
        let mut entry = MergePlanEntry {
            candidate: candidate.clone(),
            local_ref: None,
            verdict: MergeVerdict::AutoMergeable,
            conflicts: Vec::new(),
            error: None,
        };

        // No local branch follows this reference, so nothing can conflict
        let Some(local_ref) = local_ref else {
            return entry;
        };

        let probe = self
            .client
            .reference_id(&local_ref)
            .and_then(|ours| match ours {
                Some(ours) => self.client.merge_dry_run(ours, candidate.new_id),
                None => Ok(MergeProbe::Clean),
            });

        match probe {
            Ok(MergeProbe::Clean) => {}
            Ok(MergeProbe::Conflicted { paths }) => {
                entry.verdict = if local_ref == checked_out {
                    MergeVerdict::Conflicted
                } else {
                    MergeVerdict::Deferred
                };
                entry.conflicts = paths;
            }
            Err(e) => {
                tracing::warn!(
                    reference = %candidate.tracking_ref,
                    local = %local_ref,
                    error = %e,
                    "Merge probe failed; treating pair as conflicted"
                );
                entry.verdict = MergeVerdict::Conflicted;
                entry.error = Some(e.to_string());
            }
        }

        entry.local_ref = Some(local_ref);
        entry
    }
}
