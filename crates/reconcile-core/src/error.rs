//! Error types for reconcile-core

/// Result type for reconcile-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in reconcile-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error from the git client
    #[error(transparent)]
    Git(#[from] reconcile_git::Error),

    /// The operation observed a cancellation request
    #[error("Operation cancelled")]
    Cancelled,

    /// A background operation panicked instead of returning
    #[error("Background task failed unexpectedly: {message}")]
    TaskPanicked { message: String },

    /// A stage needed a remote but none was chosen
    #[error("No remote selected")]
    NoRemoteSelected,

    /// Unrecognised update scope
    #[error("Invalid scope: {scope} (expected 'workspace' or 'workflow')")]
    InvalidScope { scope: String },

    /// The workflow already finished or was aborted
    #[error("Workflow is no longer active")]
    Inactive,

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed
    #[error("Invalid settings: {0}")]
    Settings(#[from] toml::de::Error),
}
