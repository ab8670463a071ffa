//! Git client for the reconcile workflow
//!
//! Supplies the version-control primitives the workflow orchestrates:
//! fetching with per-reference result codes, ref-spec expansion, in-memory
//! merge probes and working tree status.

pub mod client;
pub mod error;
pub mod helpers;
pub mod refspec;
pub mod repository;

pub use client::{
    FetchOutcome, FetchProgress, FetchRequest, FileStatus, MergeProbe, RefPair, RefUpdate,
    RefUpdateResult, RemoteClient, WorkspaceStatus,
};
pub use error::{Error, Result};
pub use git2::Oid;
pub use refspec::RefSpec;
pub use repository::GitClient;
