//! Scriptable in-memory client for workflow tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use reconcile_git::{
    Error, FetchOutcome, FetchProgress, FetchRequest, MergeProbe, Oid, RefPair, RefSpec,
    RefUpdate, RefUpdateResult, RemoteClient, Result, WorkspaceStatus,
};

pub fn oid(n: u8) -> Oid {
    Oid::from_bytes(&[n; 20]).unwrap()
}

/// Update of `refs/remotes/origin/<name>` from `refs/heads/<name>`.
pub fn update(name: &str, old: Oid, new: Oid, result: RefUpdateResult) -> RefUpdate {
    RefUpdate::new(
        format!("refs/heads/{name}"),
        format!("refs/remotes/origin/{name}"),
        old,
        new,
        result,
    )
}

/// How a merge probe for a given incoming commit behaves.
#[derive(Debug, Clone)]
pub enum Probe {
    Clean,
    Conflict(Vec<&'static str>),
    Fail(&'static str),
}

/// Pauses a client call until the test releases it.
pub struct Gate {
    started: Sender<()>,
    release: Receiver<()>,
}

/// Test side of a [`Gate`].
pub struct GateControl {
    pub started: Receiver<()>,
    pub release: Sender<()>,
}

pub fn gate() -> (Gate, GateControl) {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    (
        Gate {
            started: started_tx,
            release: release_rx,
        },
        GateControl {
            started: started_rx,
            release: release_tx,
        },
    )
}

pub struct FakeClient {
    remotes: Vec<(String, String)>,
    branch: String,
    head: Option<Oid>,
    refspecs: Vec<RefSpec>,
    updates: Vec<RefUpdate>,
    fetch_error: Option<String>,
    fetch_panics: bool,
    refs: HashMap<String, Oid>,
    pairs: Vec<RefPair>,
    probes: HashMap<Oid, Probe>,
    workspace: WorkspaceStatus,
    gate: Mutex<Option<Gate>>,
    merge_gate: Mutex<Option<Gate>>,
    finished: Mutex<Option<Sender<()>>>,

    pub requests: Mutex<Vec<FetchRequest>>,
    pub fetch_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub saw_cancel: AtomicBool,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            remotes: vec![(
                "origin".to_string(),
                "https://example.com/project.git".to_string(),
            )],
            branch: "main".to_string(),
            head: Some(oid(1)),
            refspecs: vec![RefSpec::parse("+refs/heads/*:refs/remotes/origin/*").unwrap()],
            updates: Vec::new(),
            fetch_error: None,
            fetch_panics: false,
            refs: HashMap::new(),
            pairs: Vec::new(),
            probes: HashMap::new(),
            workspace: WorkspaceStatus::default(),
            gate: Mutex::new(None),
            merge_gate: Mutex::new(None),
            finished: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            fetch_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            saw_cancel: AtomicBool::new(false),
        }
    }

    pub fn with_remote(mut self, name: &str, url: &str) -> Self {
        self.remotes.push((name.to_string(), url.to_string()));
        self
    }

    pub fn with_updates(mut self, updates: Vec<RefUpdate>) -> Self {
        self.updates = updates;
        self
    }

    pub fn with_fetch_error(mut self, message: &str) -> Self {
        self.fetch_error = Some(message.to_string());
        self
    }

    pub fn with_fetch_panic(mut self) -> Self {
        self.fetch_panics = true;
        self
    }

    /// Local branch `name` at `id`, following `refs/remotes/origin/<name>`.
    pub fn with_local_branch(mut self, name: &str, id: Oid) -> Self {
        let local_ref = format!("refs/heads/{name}");
        self.refs.insert(local_ref.clone(), id);
        self.pairs.push(RefPair {
            remote_ref: format!("refs/remotes/origin/{name}"),
            local_ref,
        });
        self
    }

    /// Probe behaviour when merging the commit `theirs`.
    pub fn with_probe(mut self, theirs: Oid, probe: Probe) -> Self {
        self.probes.insert(theirs, probe);
        self
    }

    pub fn with_workspace(mut self, workspace: WorkspaceStatus) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_gate(self, gate: Gate) -> Self {
        *self.gate.lock().unwrap() = Some(gate);
        self
    }

    /// Hold the first merge dry-run until the test releases it.
    pub fn with_merge_gate(self, gate: Gate) -> Self {
        *self.merge_gate.lock().unwrap() = Some(gate);
        self
    }

    /// Signal `done` when a fetch call returns.
    pub fn with_finished_signal(self, done: Sender<()>) -> Self {
        *self.finished.lock().unwrap() = Some(done);
        self
    }

    fn run_fetch(
        &self,
        progress: &mut dyn FnMut(&FetchProgress) -> bool,
    ) -> Result<FetchOutcome> {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.started.send(()).ok();
            gate.release.recv().ok();
        }

        let stats = FetchProgress {
            received_objects: 3,
            indexed_objects: 3,
            total_objects: 3,
            received_bytes: 512,
        };
        if !progress(&stats) {
            self.saw_cancel.store(true, Ordering::SeqCst);
            return Err(Error::Cancelled);
        }

        if self.fetch_panics {
            panic!("transport exploded");
        }
        if let Some(message) = &self.fetch_error {
            return Err(Error::Io(std::io::Error::other(message.clone())));
        }

        Ok(FetchOutcome {
            uri: self.remotes[0].1.clone(),
            updates: self.updates.clone(),
        })
    }
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteClient for FakeClient {
    fn remote_names(&self) -> Result<Vec<String>> {
        Ok(self.remotes.iter().map(|(name, _)| name.clone()).collect())
    }

    fn resolve_remote(&self, identifier: &str) -> Result<Option<String>> {
        let identifier = identifier.trim();
        Ok(self
            .remotes
            .iter()
            .find(|(name, url)| name == identifier || url == identifier)
            .map(|(name, _)| name.clone()))
    }

    fn configured_fetch_refspecs(&self, _remote: &str) -> Result<Vec<RefSpec>> {
        Ok(self.refspecs.clone())
    }

    fn current_branch_name(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn head_id(&self) -> Result<Option<Oid>> {
        Ok(self.head)
    }

    fn reference_id(&self, name: &str) -> Result<Option<Oid>> {
        Ok(self.refs.get(name).copied())
    }

    fn fetch(
        &self,
        request: &FetchRequest,
        progress: &mut dyn FnMut(&FetchProgress) -> bool,
    ) -> Result<FetchOutcome> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let result = self.run_fetch(progress);
        if let Some(done) = self.finished.lock().unwrap().take() {
            done.send(()).ok();
        }
        result
    }

    fn resolve_reference_pairs(&self, _refspecs: &[RefSpec]) -> Result<Vec<RefPair>> {
        Ok(self.pairs.clone())
    }

    fn merge_dry_run(&self, _ours: Oid, theirs: Oid) -> Result<MergeProbe> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.merge_gate.lock().unwrap().take() {
            gate.started.send(()).ok();
            gate.release.recv().ok();
        }
        match self.probes.get(&theirs).cloned().unwrap_or(Probe::Clean) {
            Probe::Clean => Ok(MergeProbe::Clean),
            Probe::Conflict(paths) => Ok(MergeProbe::Conflicted {
                paths: paths.into_iter().map(String::from).collect(),
            }),
            Probe::Fail(message) => Err(Error::Io(std::io::Error::other(message))),
        }
    }

    fn workspace_status(&self) -> Result<WorkspaceStatus> {
        Ok(self.workspace.clone())
    }
}

pub fn shared(client: FakeClient) -> (Arc<FakeClient>, Arc<dyn RemoteClient>) {
    let client = Arc::new(client);
    let dynamic: Arc<dyn RemoteClient> = client.clone();
    (client, dynamic)
}
