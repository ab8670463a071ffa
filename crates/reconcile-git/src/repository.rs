//! git2-backed [`RemoteClient`]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use git2::{AutotagOption, BranchType, Direction, FetchOptions, Oid, RemoteCallbacks, Repository};

use crate::client::{
    FetchOutcome, FetchProgress, FetchRequest, MergeProbe, RefPair, RefUpdate, RefUpdateResult,
    RemoteClient, WorkspaceStatus,
};
use crate::helpers::{
    classify_ref_error, collect_workspace_status, download_error, get_current_branch,
    plan_ref_update, probe_merge, reference_target,
};
use crate::refspec::RefSpec;
use crate::{Error, Result};

/// Remote client over a repository on disk.
///
/// Holds only the path; every operation opens its own [`Repository`] so the
/// client can be shared with worker threads.
#[derive(Debug, Clone)]
pub struct GitClient {
    root: PathBuf,
}

impl GitClient {
    /// Create a client for the repository containing `path`.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::discover(path.as_ref())?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo.path().to_path_buf());
        Ok(Self { root })
    }

    /// Working directory (or git directory for bare repositories)
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn open(&self) -> Result<Repository> {
        Ok(Repository::open(&self.root)?)
    }

    fn find_remote<'r>(repo: &'r Repository, name: &str) -> Result<git2::Remote<'r>> {
        repo.find_remote(name).map_err(|_| Error::RemoteNotFound {
            name: name.to_string(),
        })
    }
}

impl RemoteClient for GitClient {
    fn remote_names(&self) -> Result<Vec<String>> {
        let repo = self.open()?;
        let remotes = repo.remotes()?;
        Ok(remotes.iter().flatten().map(str::to_string).collect())
    }

    fn resolve_remote(&self, identifier: &str) -> Result<Option<String>> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }

        let repo = self.open()?;
        for name in repo.remotes()?.iter().flatten() {
            if name == identifier {
                return Ok(Some(name.to_string()));
            }
            let remote = repo.find_remote(name)?;
            if remote.url() == Some(identifier) {
                return Ok(Some(name.to_string()));
            }
        }

        Ok(None)
    }

    fn configured_fetch_refspecs(&self, remote: &str) -> Result<Vec<RefSpec>> {
        let repo = self.open()?;
        let remote = Self::find_remote(&repo, remote)?;
        let specs = remote.fetch_refspecs()?;
        specs.iter().flatten().map(RefSpec::parse).collect()
    }

    fn current_branch_name(&self) -> Result<String> {
        let repo = self.open()?;
        get_current_branch(&repo)?.ok_or(Error::DetachedHead)
    }

    fn head_id(&self) -> Result<Option<Oid>> {
        let repo = self.open()?;
        match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?.id())),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn reference_id(&self, name: &str) -> Result<Option<Oid>> {
        let repo = self.open()?;
        reference_target(&repo, name)
    }

    fn fetch(
        &self,
        request: &FetchRequest,
        progress: &mut dyn FnMut(&FetchProgress) -> bool,
    ) -> Result<FetchOutcome> {
        let repo = self.open()?;
        let mut remote = Self::find_remote(&repo, &request.remote)?;
        let uri = remote.url().unwrap_or_default().to_string();

        let specs: Vec<String> = request.refspecs.iter().map(ToString::to_string).collect();
        tracing::debug!(remote = %request.remote, refspecs = ?specs, "Listing remote heads");

        // Peeled tag entries (`refs/tags/v1^{}`) and `HEAD` are not references to fetch
        let heads: Vec<(String, Oid)> = {
            let connection = remote.connect_auth(Direction::Fetch, None, None)?;
            connection
                .list()?
                .iter()
                .filter(|head| head.name() != "HEAD" && !head.name().ends_with("^{}"))
                .filter(|head| request.refspecs.iter().any(|s| s.matches_source(head.name())))
                .map(|head| (head.name().to_string(), head.oid()))
                .collect()
        };

        if !heads.is_empty() {
            let mut callbacks = RemoteCallbacks::new();
            callbacks.transfer_progress(|stats| {
                progress(&FetchProgress {
                    received_objects: stats.received_objects(),
                    indexed_objects: stats.indexed_objects(),
                    total_objects: stats.total_objects(),
                    received_bytes: stats.received_bytes(),
                })
            });

            let mut opts = FetchOptions::new();
            opts.remote_callbacks(callbacks);
            opts.download_tags(AutotagOption::None);

            remote
                .download(&specs, Some(&mut opts))
                .map_err(download_error)?;
            remote.disconnect()?;
        }

        let checked_out = get_current_branch(&repo)?.map(|b| format!("refs/heads/{}", b));
        let mut seen = HashSet::new();
        let mut updates = Vec::new();

        for spec in &request.refspecs {
            for (remote_name, new_id) in &heads {
                let Some(local_name) = spec.to_destination(remote_name) else {
                    continue;
                };
                if !seen.insert(local_name.clone()) {
                    continue;
                }

                let (old, mut result) = match reference_target(&repo, &local_name) {
                    Ok(old) => {
                        let result = plan_ref_update(
                            &repo,
                            &local_name,
                            old,
                            *new_id,
                            spec.is_force(),
                            request.check_objects,
                            checked_out.as_deref(),
                        );
                        (old, result)
                    }
                    Err(e) => {
                        tracing::warn!(
                            reference = %local_name,
                            error = %e,
                            "Could not read tracking reference"
                        );
                        let result = match &e {
                            Error::Git(e) => classify_ref_error(e),
                            _ => RefUpdateResult::RejectedOtherReason,
                        };
                        (None, result)
                    }
                };

                if matches!(
                    result,
                    RefUpdateResult::New | RefUpdateResult::FastForward | RefUpdateResult::Forced
                ) {
                    let message = format!("fetch {}: {}", request.remote, result);
                    if let Err(e) = repo.reference(&local_name, *new_id, true, &message) {
                        tracing::warn!(
                            reference = %local_name,
                            error = %e,
                            "Failed to update tracking reference"
                        );
                        result = classify_ref_error(&e);
                    }
                }

                updates.push(RefUpdate::new(
                    remote_name.clone(),
                    local_name,
                    old.unwrap_or_else(Oid::zero),
                    *new_id,
                    result,
                ));
            }
        }

        Ok(FetchOutcome { uri, updates })
    }

    fn resolve_reference_pairs(&self, refspecs: &[RefSpec]) -> Result<Vec<RefPair>> {
        let repo = self.open()?;

        // Tracking ref -> local branch, from branch upstream configuration
        let mut upstreams: HashMap<String, String> = HashMap::new();
        for branch in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            let Some(local_ref) = branch.get().name().map(str::to_string) else {
                continue;
            };
            if let Ok(upstream) = branch.upstream()
                && let Some(remote_ref) = upstream.get().name()
            {
                upstreams
                    .entry(remote_ref.to_string())
                    .or_insert(local_ref);
            }
        }

        let mut seen = HashSet::new();
        let mut pairs = Vec::new();

        for spec in refspecs {
            let Some(destination) = spec.destination() else {
                continue;
            };

            let mut tracking: Vec<String> = repo
                .references_glob(destination)?
                .names()
                .filter_map(|name| name.ok().map(str::to_string))
                .filter(|name| spec.matches_destination(name))
                .collect();
            tracking.sort();

            for remote_ref in tracking {
                if !seen.insert(remote_ref.clone()) {
                    continue;
                }

                let local_ref = match upstreams.get(&remote_ref) {
                    Some(local) => Some(local.clone()),
                    None => spec
                        .to_source(&remote_ref)
                        .filter(|src| matches!(reference_target(&repo, src), Ok(Some(_)))),
                };

                if let Some(local_ref) = local_ref {
                    pairs.push(RefPair {
                        remote_ref,
                        local_ref,
                    });
                }
            }
        }

        Ok(pairs)
    }

    fn merge_dry_run(&self, ours: Oid, theirs: Oid) -> Result<MergeProbe> {
        let repo = self.open()?;
        probe_merge(&repo, ours, theirs)
    }

    fn workspace_status(&self) -> Result<WorkspaceStatus> {
        let repo = self.open()?;
        collect_workspace_status(&repo)
    }
}
