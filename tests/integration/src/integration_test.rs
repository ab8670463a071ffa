//! End-to-end integration tests across the reconcile crates
//!
//! Exercises the complete flow against real repositories: settings loading
//! -> workspace check -> fetch -> classification -> merge dry-run.

use std::sync::Arc;

use reconcile_core::{
    FinishHeader, MergeVerdict, SETTINGS_FILE, Settings, StageId, StageInput, Transition,
    Workflow, check_workspace,
};
use reconcile_git::{GitClient, RefUpdateResult, RemoteClient};
use reconcile_test_utils::RemotePair;
use reconcile_test_utils::git::git;

/// Drive a workflow with defaults only, as `reconcile update --yes` does.
async fn run_defaults(pair: &RemotePair) -> Workflow {
    let client = GitClient::discover(pair.local()).unwrap();
    let settings = Settings::load(client.root()).unwrap();
    let client: Arc<dyn RemoteClient> = Arc::new(client);

    assert!(check_workspace(client.as_ref()).unwrap().is_ready());

    let mut workflow =
        Workflow::start(client, settings, tokio::runtime::Handle::current()).unwrap();
    assert_eq!(
        workflow.submit(StageInput::Continue).unwrap(),
        Transition::Next(StageId::SelectScope)
    );
    assert_eq!(
        workflow.submit(StageInput::Continue).unwrap(),
        Transition::Next(StageId::Fetch)
    );
    workflow.settle().await;
    assert_eq!(
        workflow.submit(StageInput::Continue).unwrap(),
        Transition::Next(StageId::Finish)
    );
    workflow.settle().await;
    workflow
}

#[tokio::test(flavor = "multi_thread")]
async fn test_workflow_scope_defers_conflict_in_other_branch() {
    let pair = RemotePair::new();
    let local = pair.local();

    // Local `dev` follows origin/dev and carries its own change
    pair.branch_upstream("dev");
    git(local, &["fetch", "origin"]);
    git(local, &["checkout", "-b", "dev", "origin/dev"]);
    pair.commit_local("data.csv", "local,row", "Local data");
    git(local, &["checkout", "main"]);

    // An uncommitted settings file does not count as a local change
    std::fs::write(
        local.join(SETTINGS_FILE),
        "default_remote = \"origin\"\ndefault_scope = \"workflow\"\n",
    )
    .unwrap();

    pair.checkout_upstream("dev");
    pair.commit_upstream("data.csv", "upstream,row", "Upstream data");
    pair.checkout_upstream("main");
    pair.branch_upstream("feature");

    let workflow = run_defaults(&pair).await;
    let context = workflow.context().unwrap();

    let outcome = context.fetch_outcome.as_ref().unwrap();
    let result_of = |name: &str| {
        outcome
            .updates
            .iter()
            .find(|u| u.local_name == name)
            .map(|u| u.result)
    };
    assert_eq!(
        result_of("refs/remotes/origin/dev"),
        Some(RefUpdateResult::FastForward)
    );
    assert_eq!(
        result_of("refs/remotes/origin/feature"),
        Some(RefUpdateResult::New)
    );
    assert_eq!(
        result_of("refs/remotes/origin/main"),
        Some(RefUpdateResult::NoChange)
    );

    let report = workflow.finish_report().unwrap();
    assert_eq!(report.header, FinishHeader::Changed);
    let plan = report.plan.as_ref().unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.entries[0].local_ref.as_deref(), Some("refs/heads/dev"));
    assert_eq!(plan.entries[0].verdict, MergeVerdict::Deferred);
    assert_eq!(plan.entries[0].conflicts, vec!["data.csv".to_string()]);

    // Nothing was merged
    assert_eq!(git(local, &["rev-parse", "--abbrev-ref", "HEAD"]), "main");
    assert_eq!(git(local, &["show", "dev:data.csv"]), "local,row");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rewritten_upstream_history_is_forced() {
    let pair = RemotePair::new();
    let upstream = pair.upstream();

    pair.commit_upstream("a.txt", "first", "First");
    git(pair.local(), &["fetch", "origin"]);

    git(upstream, &["reset", "--hard", "HEAD~1"]);
    pair.commit_upstream("b.txt", "second", "Rewritten");

    let workflow = run_defaults(&pair).await;
    let context = workflow.context().unwrap();

    let updates = &context.fetch_outcome.as_ref().unwrap().updates;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].result, RefUpdateResult::Forced);

    let report = workflow.finish_report().unwrap();
    assert_eq!(report.header, FinishHeader::Changed);
    let plan = report.plan.as_ref().unwrap();
    assert_eq!(plan.entries[0].verdict, MergeVerdict::AutoMergeable);
}
