//! The update workflow state machine
//!
//! A [`Workflow`] owns the [`SessionContext`] and the active [`Stage`]. All
//! transitions happen on the caller's (control) thread through
//! [`Workflow::submit`], [`Workflow::back`] and [`Workflow::cancel`]. The fetch
//! and the merge dry-run run as background tasks; while one runs, the context
//! is owned by that task and comes back with its completion.

use std::sync::Arc;

use reconcile_git::{FetchOutcome, FetchProgress, FetchRequest, Oid, RemoteClient};
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::analyze::MergeCandidate;
use crate::context::{Scope, SessionContext};
use crate::message::{self, FinishReport};
use crate::plan::{MergePlan, MergePlanner, scope_refspecs};
use crate::settings::Settings;
use crate::stage::{Stage, StageDescriptor, StageId, StageInput, StageView, Transition};
use crate::task::{self, Progress, Reporter, TaskEvent};
use crate::{Error, Result};

/// Overall state of a workflow run, as reported to whoever launched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Running,
    /// The finish stage was accepted
    Finished,
    /// Cancelled or aborted before completion
    Aborted,
}

/// One run of the update workflow.
pub struct Workflow {
    client: Arc<dyn RemoteClient>,
    settings: Settings,
    runtime: Handle,
    session: Uuid,
    stage: Stage,
    context: Option<SessionContext>,
    /// Remote and scope handed to the last background task
    launched_with: (Option<String>, Scope),
    status: WorkflowStatus,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("session", &self.session)
            .field("stage", &self.stage.id())
            .field("status", &self.status)
            .finish()
    }
}

impl Workflow {
    /// Create the session context and enter the choose-remote stage.
    pub fn start(
        client: Arc<dyn RemoteClient>,
        settings: Settings,
        runtime: Handle,
    ) -> Result<Self> {
        let context = SessionContext::new(settings.default_scope);
        let session = context.id;
        let remotes = client.remote_names()?;
        let default = default_remote(&remotes, settings.default_remote.as_deref());

        tracing::info!(session = %session, "Initiated update of local workspace");

        Ok(Self {
            client,
            settings,
            runtime,
            session,
            stage: Stage::ChooseRemote { remotes, default },
            context: Some(context),
            launched_with: (None, Scope::default()),
            status: WorkflowStatus::Running,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// True only when the workflow completed normally
    pub fn is_finished(&self) -> bool {
        self.status == WorkflowStatus::Finished
    }

    pub fn is_aborted(&self) -> bool {
        self.status == WorkflowStatus::Aborted
    }

    pub fn stage(&self) -> StageId {
        self.stage.id()
    }

    pub fn descriptor(&self) -> StageDescriptor {
        self.stage.id().descriptor()
    }

    /// The session context, unless a background task currently owns it
    /// or the workflow has ended.
    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// Whether a fetch or dry-run is in flight
    pub fn is_busy(&self) -> bool {
        match &self.stage {
            Stage::Fetch { task, .. } => task.is_some(),
            Stage::Finish { dry_run, .. } => dry_run.is_some(),
            _ => false,
        }
    }

    /// Report of the finish stage, once it was entered.
    pub fn finish_report(&self) -> Option<&FinishReport> {
        match &self.stage {
            Stage::Finish { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Only the scope stage may return; once fetching began there is no way back.
    pub fn can_go_back(&self) -> bool {
        self.status == WorkflowStatus::Running && self.stage.id() == StageId::SelectScope
    }

    /// Describe the active stage for a UI.
    pub fn render(&self) -> StageView {
        match &self.stage {
            Stage::ChooseRemote { remotes, default } => StageView::ChooseRemote {
                remotes: remotes.clone(),
                default: default.clone(),
            },
            Stage::SelectScope { default } => StageView::SelectScope { default: *default },
            Stage::Fetch {
                task,
                last_transfer,
            } => StageView::Fetch {
                remote: self.launched_with.0.clone(),
                running: task.is_some(),
                last_transfer: *last_transfer,
            },
            Stage::Finish { report, .. } => StageView::Finish {
                message: report.message(),
                report: report.clone(),
            },
        }
    }

    /// Run the active stage's exit hook with `input` and apply the result.
    pub fn submit(&mut self, input: StageInput) -> Result<Transition> {
        if self.status != WorkflowStatus::Running {
            return Err(Error::Inactive);
        }

        let from = self.stage.id();
        let transition = self.advance(input);
        tracing::debug!(
            session = %self.session,
            from = ?from,
            transition = ?transition,
            "Stage advanced"
        );

        match &transition {
            Transition::Next(next) => self.enter(*next),
            Transition::Stay(_) => {}
            Transition::Abort => self.terminate("aborted"),
            Transition::Done => {
                self.context = None;
                self.status = WorkflowStatus::Finished;
                tracing::info!(session = %self.session, "Finished updating local workspace");
            }
        }

        Ok(transition)
    }

    /// Return to the previous stage. Returns `false` when not allowed.
    pub fn back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        self.enter(StageId::ChooseRemote);
        true
    }

    /// Abort the workflow, discarding the context and any pending work.
    ///
    /// Accepted in every stage while running, Finish included, so a merge
    /// dry-run still in progress can be stopped. The workflow then reports
    /// aborted, never finished. Idempotent; has no effect once the workflow ended.
    pub fn cancel(&mut self) {
        if self.status == WorkflowStatus::Running {
            self.terminate("cancelled");
        }
    }

    /// Deliver whatever the running task produced so far. Never blocks.
    pub fn poll(&mut self) -> Vec<Progress> {
        let mut delivered = Vec::new();
        while let Some(event) = self.stage.task_mut().and_then(|t| t.try_next()) {
            if let Some(progress) = self.handle_event(event) {
                delivered.push(progress);
            }
        }
        delivered
    }

    /// Wait until the running task completes, returning its progress events.
    pub async fn settle(&mut self) -> Vec<Progress> {
        let mut delivered = Vec::new();
        self.settle_with(|p| delivered.push(p.clone())).await;
        delivered
    }

    /// Wait until the running task completes, handing each progress event to `on_progress`.
    pub async fn settle_with(&mut self, mut on_progress: impl FnMut(&Progress)) {
        while let Some(task) = self.stage.task_mut() {
            match task.next().await {
                Some(event) => {
                    if let Some(progress) = self.handle_event(event) {
                        on_progress(&progress);
                    }
                }
                None => {
                    if self.status != WorkflowStatus::Running {
                        break;
                    }
                    self.complete(Err(Error::TaskPanicked {
                        message: "background task ended without a result".to_string(),
                    }));
                }
            }
        }
    }

    fn advance(&mut self, input: StageInput) -> Transition {
        match &self.stage {
            Stage::ChooseRemote { default, .. } => {
                let identifier = match input {
                    StageInput::Remote(remote) => remote,
                    StageInput::Continue => match default {
                        Some(remote) => remote.clone(),
                        None => return Transition::Stay("Choose a remote repository".into()),
                    },
                    StageInput::Scope(_) => {
                        return Transition::Stay("Choose a remote repository".into());
                    }
                };

                let Some(context) = self.context.as_mut() else {
                    return Transition::Abort;
                };
                match self.client.resolve_remote(&identifier) {
                    Ok(Some(name)) => {
                        context.remote = Some(name);
                        Transition::Next(StageId::SelectScope)
                    }
                    Ok(None) => Transition::Stay(format!(
                        "'{}' is not a configured remote",
                        identifier.trim()
                    )),
                    Err(e) => {
                        tracing::error!(session = %self.session, error = %e, "Could not resolve remote");
                        Transition::Abort
                    }
                }
            }
            Stage::SelectScope { default } => {
                let scope = match input {
                    StageInput::Scope(scope) => scope,
                    StageInput::Continue => *default,
                    StageInput::Remote(_) => {
                        return Transition::Stay("Select an update scope".into());
                    }
                };
                let Some(context) = self.context.as_mut() else {
                    return Transition::Abort;
                };
                context.scope = scope;
                Transition::Next(StageId::Fetch)
            }
            Stage::Fetch { task: Some(_), .. } => {
                Transition::Stay("The update is still running".into())
            }
            Stage::Finish {
                dry_run: Some(_), ..
            } => Transition::Stay("Still checking whether the changes can be merged".into()),
            Stage::Fetch { .. } | Stage::Finish { .. } => {
                if self.stage.id().is_terminal() {
                    Transition::Done
                } else {
                    Transition::Next(StageId::Finish)
                }
            }
        }
    }

    /// Entry hooks.
    fn enter(&mut self, next: StageId) {
        match next {
            StageId::ChooseRemote => {
                let remotes = self.client.remote_names().unwrap_or_else(|e| {
                    tracing::warn!(session = %self.session, error = %e, "Could not list remotes");
                    Vec::new()
                });
                let current = self.context.as_ref().and_then(|c| c.remote.clone());
                let preferred = current.or_else(|| self.settings.default_remote.clone());
                let default = default_remote(&remotes, preferred.as_deref());
                self.stage = Stage::ChooseRemote { remotes, default };
            }
            StageId::SelectScope => {
                let default = self
                    .context
                    .as_ref()
                    .map(|c| c.scope)
                    .unwrap_or(self.settings.default_scope);
                self.stage = Stage::SelectScope { default };
            }
            StageId::Fetch => self.launch_fetch(),
            StageId::Finish => {
                self.stage = Stage::Finish {
                    report: FinishReport {
                        header: message::FinishHeader::MissingInfo,
                        detail: None,
                        dry_run_active: false,
                        plan: None,
                    },
                    dry_run: None,
                };
                self.refresh_finish();
            }
        }
    }

    fn launch_fetch(&mut self) {
        let Some(context) = self.context.take() else {
            self.terminate("missing session context");
            return;
        };

        self.launched_with = (context.remote.clone(), context.scope);
        tracing::info!(
            session = %self.session,
            remote = ?context.remote,
            scope = %context.scope,
            "Starting fetch"
        );

        let client = Arc::clone(&self.client);
        let check_objects = self.settings.check_fetched_objects;
        let task = task::spawn(&self.runtime, move |reporter| {
            run_fetch(client.as_ref(), context, check_objects, reporter)
        });

        self.stage = Stage::Fetch {
            task: Some(task),
            last_transfer: None,
        };
    }

    /// Refresh hook of the finish stage; starts a dry-run when merging may be needed.
    fn refresh_finish(&mut self) {
        let Some(context) = self.context.as_mut() else {
            return;
        };
        let refresh = message::refresh(context);
        context.final_message = Some(refresh.report.message());

        let candidates = refresh.candidates;
        if let Stage::Finish { report, .. } = &mut self.stage {
            *report = refresh.report;
        }

        if let Some(candidates) = candidates {
            self.launch_dry_run(candidates);
        }
    }

    fn launch_dry_run(&mut self, candidates: Vec<MergeCandidate>) {
        let Some(context) = self.context.take() else {
            return;
        };

        self.launched_with = (context.remote.clone(), context.scope);
        tracing::info!(
            session = %self.session,
            candidates = candidates.len(),
            "Starting merge dry-run"
        );

        let client = Arc::clone(&self.client);
        let task = task::spawn(&self.runtime, move |reporter| {
            run_dry_run(client.as_ref(), context, &candidates, reporter)
        });

        if let Stage::Finish { dry_run, .. } = &mut self.stage {
            *dry_run = Some(task);
        }
    }

    fn handle_event(&mut self, event: TaskEvent<SessionContext>) -> Option<Progress> {
        match event {
            TaskEvent::Progress(progress) => {
                if let (Stage::Fetch { last_transfer, .. }, Progress::Transfer(stats)) =
                    (&mut self.stage, &progress)
                {
                    *last_transfer = Some(*stats);
                }
                Some(progress)
            }
            TaskEvent::Finished(result) => {
                self.complete(result);
                None
            }
        }
    }

    /// Take the context back from a finished task.
    fn complete(&mut self, result: Result<SessionContext>) {
        self.stage.clear_task();

        let context = match result {
            Ok(context) => context,
            Err(Error::Cancelled) => {
                self.terminate("cancelled");
                return;
            }
            Err(e) => {
                tracing::error!(session = %self.session, error = %e, "Background task failed");
                let (remote, scope) = self.launched_with.clone();
                SessionContext::recovered(self.session, remote, scope, e)
            }
        };

        self.context = Some(context);
        if self.stage.id() == StageId::Finish {
            self.refresh_finish();
        }
    }

    fn terminate(&mut self, reason: &str) {
        if let Some(task) = self.stage.task_mut() {
            task.cancel();
        }
        self.stage.clear_task();
        self.context = None;
        self.status = WorkflowStatus::Aborted;
        tracing::info!(
            session = %self.session,
            stage = ?self.stage.id(),
            reason,
            "Update of local workspace ended without completion"
        );
    }
}

/// Preselect a remote: the preferred one if configured, else `origin`, else the only one.
fn default_remote(remotes: &[String], preferred: Option<&str>) -> Option<String> {
    if let Some(preferred) = preferred
        && remotes.iter().any(|r| r == preferred)
    {
        return Some(preferred.to_string());
    }
    if remotes.iter().any(|r| r == "origin") {
        return Some("origin".to_string());
    }
    match remotes {
        [only] => Some(only.clone()),
        _ => None,
    }
}

struct Fetched {
    branch: String,
    head: Option<Oid>,
    outcome: FetchOutcome,
}

fn perform_fetch(
    client: &dyn RemoteClient,
    context: &SessionContext,
    check_objects: bool,
    reporter: &Reporter<SessionContext>,
) -> Result<Fetched> {
    let remote = context.require_remote()?;
    let branch = client.current_branch_name()?;
    let head = client.head_id()?;
    let configured = client.configured_fetch_refspecs(remote)?;
    let refspecs = scope_refspecs(&configured, remote, context.scope, &branch);

    reporter.status(format!("Fetching from {}", remote));
    let request = FetchRequest {
        remote: remote.to_string(),
        refspecs,
        check_objects,
    };
    let outcome = client.fetch(&request, &mut |stats: &FetchProgress| {
        reporter.report(Progress::Transfer(*stats))
    })?;

    Ok(Fetched {
        branch,
        head,
        outcome,
    })
}

/// Background body of the fetch stage. After cancellation the context is
/// dropped untouched.
fn run_fetch(
    client: &dyn RemoteClient,
    mut context: SessionContext,
    check_objects: bool,
    reporter: &Reporter<SessionContext>,
) -> Result<SessionContext> {
    let result = perform_fetch(client, &context, check_objects, reporter);
    reporter.token().check()?;

    match result {
        Ok(fetched) => {
            context.branch = Some(fetched.branch);
            context.current_head = fetched.head;
            context.fetch_outcome = Some(fetched.outcome);
        }
        Err(e) => {
            tracing::warn!(session = %context.id, error = %e, "Fetch failed");
            context.error = Some(e);
        }
    }
    Ok(context)
}

fn plan_merges(
    client: &dyn RemoteClient,
    context: &SessionContext,
    candidates: &[MergeCandidate],
    reporter: &Reporter<SessionContext>,
) -> Result<MergePlan> {
    let remote = context.require_remote()?;
    let branch = match &context.branch {
        Some(branch) => branch.clone(),
        None => client.current_branch_name()?,
    };
    let configured = client.configured_fetch_refspecs(remote)?;
    let refspecs = scope_refspecs(&configured, remote, context.scope, &branch);

    let planner = MergePlanner::new(client, refspecs, branch);
    planner.plan(candidates, reporter.token(), &mut |progress| {
        reporter.report(progress);
    })
}

/// Background body of the merge dry-run.
fn run_dry_run(
    client: &dyn RemoteClient,
    mut context: SessionContext,
    candidates: &[MergeCandidate],
    reporter: &Reporter<SessionContext>,
) -> Result<SessionContext> {
    reporter.status("Checking whether the changes can be merged");
    let result = plan_merges(client, &context, candidates, reporter);
    reporter.token().check()?;

    match result {
        Ok(plan) => context.merge_dry_run = Some(plan),
        Err(e) => {
            tracing::warn!(session = %context.id, error = %e, "Merge dry-run failed");
            context.error = Some(e);
        }
    }
    Ok(context)
}
