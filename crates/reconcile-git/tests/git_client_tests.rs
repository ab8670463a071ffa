//! Tests for the git2-backed remote client against real repositories

use pretty_assertions::assert_eq;
use reconcile_git::{
    FetchRequest, GitClient, MergeProbe, Oid, RefPair, RefSpec, RefUpdateResult, RemoteClient,
};
use reconcile_test_utils::RemotePair;
use reconcile_test_utils::git::git;

fn client(pair: &RemotePair) -> GitClient {
    GitClient::discover(pair.local()).unwrap()
}

fn default_request(client: &GitClient) -> FetchRequest {
    FetchRequest {
        remote: "origin".to_string(),
        refspecs: client.configured_fetch_refspecs("origin").unwrap(),
        check_objects: true,
    }
}

fn fetch(client: &GitClient) -> reconcile_git::FetchOutcome {
    client
        .fetch(&default_request(client), &mut |_| true)
        .unwrap()
}

#[test]
fn test_configured_fetch_refspecs_of_clone() {
    let pair = RemotePair::new();
    let client = client(&pair);

    let specs = client.configured_fetch_refspecs("origin").unwrap();
    assert_eq!(
        specs,
        vec![RefSpec::parse("+refs/heads/*:refs/remotes/origin/*").unwrap()]
    );
    assert_eq!(client.remote_names().unwrap(), vec!["origin".to_string()]);
    assert_eq!(client.current_branch_name().unwrap(), "main");
}

#[test]
fn test_resolve_remote_by_name_and_url() {
    let pair = RemotePair::new();
    let client = client(&pair);
    let url = pair.upstream().to_string_lossy().to_string();

    assert_eq!(
        client.resolve_remote("origin").unwrap(),
        Some("origin".to_string())
    );
    assert_eq!(client.resolve_remote(&url).unwrap(), Some("origin".to_string()));
    assert_eq!(client.resolve_remote("upstream").unwrap(), None);
    assert_eq!(client.resolve_remote("  ").unwrap(), None);
}

#[test]
fn test_fetch_without_changes_reports_no_change() {
    let pair = RemotePair::new();
    let client = client(&pair);

    let outcome = fetch(&client);
    assert_eq!(outcome.updates.len(), 1);
    let update = &outcome.updates[0];
    assert_eq!(update.remote_name, "refs/heads/main");
    assert_eq!(update.local_name, "refs/remotes/origin/main");
    assert_eq!(update.result, RefUpdateResult::NoChange);
    assert_eq!(update.old_id, update.new_id);
}

#[test]
fn test_fetch_fast_forward_and_new_branch() {
    let pair = RemotePair::new();
    let client = client(&pair);
    let before = client
        .reference_id("refs/remotes/origin/main")
        .unwrap()
        .unwrap();

    let tip = pair.commit_upstream("data.txt", "one", "Add data");
    pair.branch_upstream("feature");

    let outcome = fetch(&client);
    let main = outcome
        .updates
        .iter()
        .find(|u| u.local_name == "refs/remotes/origin/main")
        .unwrap();
    assert_eq!(main.result, RefUpdateResult::FastForward);
    assert_eq!(main.old_id, before);
    assert_eq!(main.new_id, Oid::from_str(&tip).unwrap());

    let feature = outcome
        .updates
        .iter()
        .find(|u| u.local_name == "refs/remotes/origin/feature")
        .unwrap();
    assert_eq!(feature.result, RefUpdateResult::New);
    assert!(feature.old_id.is_zero());

    assert_eq!(
        client.reference_id("refs/remotes/origin/main").unwrap(),
        Some(Oid::from_str(&tip).unwrap())
    );
}

#[test]
fn test_fetch_rewritten_history_is_forced() {
    let pair = RemotePair::new();
    let client = client(&pair);

    pair.commit_upstream("data.txt", "one", "First");
    fetch(&client);

    git(pair.upstream(), &["reset", "--hard", "HEAD~1"]);
    pair.commit_upstream("other.txt", "two", "Rewritten");

    let outcome = fetch(&client);
    assert_eq!(outcome.updates[0].result, RefUpdateResult::Forced);
}

#[test]
fn test_fetch_rewritten_history_without_force_is_rejected() {
    let pair = RemotePair::new();
    let client = client(&pair);

    pair.commit_upstream("data.txt", "one", "First");
    fetch(&client);

    git(pair.upstream(), &["reset", "--hard", "HEAD~1"]);
    pair.commit_upstream("other.txt", "two", "Rewritten");

    let request = FetchRequest {
        remote: "origin".to_string(),
        refspecs: vec![RefSpec::parse("refs/heads/*:refs/remotes/origin/*").unwrap()],
        check_objects: true,
    };
    let outcome = client.fetch(&request, &mut |_| true).unwrap();
    assert_eq!(outcome.updates[0].result, RefUpdateResult::Rejected);
}

#[test]
fn test_fetch_annotated_tag_with_tag_refspec() {
    let pair = RemotePair::new();
    git(pair.upstream(), &["tag", "-a", "v1", "-m", "Release v1"]);
    git(
        pair.local(),
        &["config", "--add", "remote.origin.fetch", "+refs/tags/*:refs/tags/*"],
    );
    let client = client(&pair);

    let outcome = fetch(&client);
    let names: Vec<(&str, RefUpdateResult)> = outcome
        .updates
        .iter()
        .map(|u| (u.local_name.as_str(), u.result))
        .collect();
    assert_eq!(
        names,
        vec![
            ("refs/remotes/origin/main", RefUpdateResult::NoChange),
            ("refs/tags/v1", RefUpdateResult::New),
        ]
    );
    assert!(client.reference_id("refs/tags/v1").unwrap().is_some());
}

#[test]
fn test_fetch_unknown_remote_is_error() {
    let pair = RemotePair::new();
    let client = client(&pair);

    let request = FetchRequest {
        remote: "nowhere".to_string(),
        refspecs: Vec::new(),
        check_objects: true,
    };
    let err = client.fetch(&request, &mut |_| true).unwrap_err();
    let err_str = err.to_string();
    assert!(
        err_str.contains("nowhere") && err_str.contains("not found"),
        "Expected remote not found error, got: {}",
        err_str
    );
}

#[test]
fn test_resolve_reference_pairs_uses_upstream_config() {
    let pair = RemotePair::new();
    let client = client(&pair);
    pair.branch_upstream("feature");
    fetch(&client);

    let specs = client.configured_fetch_refspecs("origin").unwrap();
    let pairs = client.resolve_reference_pairs(&specs).unwrap();

    // origin/feature has no local branch yet, origin/HEAD maps to nothing
    assert_eq!(
        pairs,
        vec![RefPair {
            remote_ref: "refs/remotes/origin/main".to_string(),
            local_ref: "refs/heads/main".to_string(),
        }]
    );
}

#[test]
fn test_merge_dry_run_clean_and_conflicted() {
    let pair = RemotePair::new();
    let client = client(&pair);

    pair.commit_upstream("README.md", "upstream text", "Upstream edit");
    let clean_local = pair.commit_local("local.txt", "local", "Local edit");
    fetch(&client);
    let theirs = client
        .reference_id("refs/remotes/origin/main")
        .unwrap()
        .unwrap();

    let probe = client
        .merge_dry_run(Oid::from_str(&clean_local).unwrap(), theirs)
        .unwrap();
    assert_eq!(probe, MergeProbe::Clean);

    let conflicting = pair.commit_local("README.md", "local text", "Conflicting edit");
    let probe = client
        .merge_dry_run(Oid::from_str(&conflicting).unwrap(), theirs)
        .unwrap();
    assert_eq!(
        probe,
        MergeProbe::Conflicted {
            paths: vec!["README.md".to_string()]
        }
    );

    // The probe never moves HEAD
    assert_eq!(
        client.head_id().unwrap(),
        Some(Oid::from_str(&conflicting).unwrap())
    );
}

#[test]
fn test_workspace_status_of_fresh_clone_is_clean() {
    let pair = RemotePair::new();
    let client = client(&pair);

    assert!(client.workspace_status().unwrap().is_clean());

    std::fs::write(pair.local().join("README.md"), "changed").unwrap();
    std::fs::remove_file(pair.local().join("README.md")).ok();
    let status = client.workspace_status().unwrap();
    assert!(!status.is_clean());
}
