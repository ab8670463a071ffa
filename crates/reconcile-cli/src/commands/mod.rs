//! Command implementations for reconcile-cli

pub mod remotes;
pub mod status;
pub mod update;

pub use remotes::run_remotes;
pub use status::run_status;
pub use update::{UpdateOptions, run_update};
