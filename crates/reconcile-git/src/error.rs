//! Error types for reconcile-git

/// Result type for reconcile-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in reconcile-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote '{name}' not found")]
    RemoteNotFound { name: String },

    #[error("HEAD is detached; check out a branch before updating")]
    DetachedHead,

    #[error("Invalid ref-spec '{spec}': {reason}")]
    InvalidRefSpec { spec: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,
}
