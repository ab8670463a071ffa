//! Shared test utilities for the reconcile workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`]: git repository fixtures driven through the `git` CLI
//! - [`remote`]: [`RemotePair`], an upstream repository plus a clone of it

pub mod git;
pub mod remote;

pub use remote::RemotePair;
