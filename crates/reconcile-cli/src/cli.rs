//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Reconcile - update a local repository from a remote, checking merges before they happen
#[derive(Parser, Debug)]
#[command(name = "reconcile")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository to operate on (defaults to the current directory)
    #[arg(short = 'C', long, global = true, env = "RECONCILE_DIR")]
    pub path: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Fetch from a remote and check whether the changes merge cleanly
    ///
    /// Examples:
    ///   reconcile update                          # Prompt for remote and scope
    ///   reconcile update --remote origin --yes    # Use origin with the default scope
    ///   reconcile update -r upstream -s workflow  # All configured branches of upstream
    Update {
        /// Remote name or URL
        #[arg(short, long)]
        remote: Option<String>,

        /// Update scope: workspace (current branch) or workflow (all branches)
        #[arg(short, long)]
        scope: Option<String>,

        /// Accept defaults instead of prompting
        #[arg(short, long)]
        yes: bool,
    },

    /// Show local changes that would block an update
    Status,

    /// List configured remotes and their fetch ref-specs
    Remotes,
}
