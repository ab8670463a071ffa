//! Fetch reconciliation workflow
//!
//! This crate drives a guided "update from remote" session on top of
//! `reconcile-git`:
//!
//! - **Classification**: per-reference fetch results grouped by result code
//!   and partitioned into unchanged, changed and failed
//! - **Analysis**: failure priority and extraction of merge candidates
//! - **Planning**: a read-only merge dry-run per candidate
//! - **Workflow**: the `ChooseRemote -> SelectScope -> Fetch -> Finish` state
//!   machine, with fetch and dry-run running off the control thread
//!
//! # Architecture
//!
//! ```text
//!                 reconcile-cli
//!                       |
//!                 reconcile-core
//!     workflow -> stage, task, message, plan
//!     message  -> analyze -> classify
//!                       |
//!                 reconcile-git
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reconcile_core::{Settings, StageInput, Workflow};
//! use reconcile_git::GitClient;
//!
//! async fn update(root: &std::path::Path) -> reconcile_core::Result<()> {
//!     let client = Arc::new(GitClient::discover(root)?);
//!     let settings = Settings::load(root)?;
//!     let mut workflow = Workflow::start(client, settings, tokio::runtime::Handle::current())?;
//!     workflow.submit(StageInput::Continue)?; // remote
//!     workflow.submit(StageInput::Continue)?; // scope, starts the fetch
//!     workflow.settle().await;
//!     workflow.submit(StageInput::Continue)?; // to finish, may start a dry-run
//!     workflow.settle().await;
//!     workflow.submit(StageInput::Continue)?;
//!     Ok(())
//! }
//! ```

pub mod analyze;
pub mod classify;
pub mod context;
pub mod error;
pub mod message;
pub mod plan;
pub mod settings;
pub mod stage;
pub mod task;
pub mod workflow;
pub mod workspace;

pub use analyze::{FailureKind, MergeCandidate};
pub use classify::{Partition, UpdatesByResult};
pub use context::{Scope, SessionContext};
pub use error::{Error, Result};
pub use message::{FinishHeader, FinishReport};
pub use plan::{MergePlan, MergePlanEntry, MergePlanner, MergeVerdict};
pub use settings::{SETTINGS_FILE, Settings};
pub use stage::{StageDescriptor, StageId, StageInput, StageView, Transition};
pub use task::{CancelToken, Progress, Reporter, TaskEvent, TaskHandle};
pub use workflow::{Workflow, WorkflowStatus};
pub use workspace::{WorkspaceCheck, check_workspace, spawn_workspace_check};
