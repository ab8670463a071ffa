//! Remotes command implementation

use std::path::Path;

use colored::Colorize;
use reconcile_git::{GitClient, RemoteClient};

use crate::error::Result;

/// List configured remotes with their fetch ref-specs.
pub fn run_remotes(path: &Path) -> Result<()> {
    let client = GitClient::discover(path)?;
    let remotes = client.remote_names()?;

    if remotes.is_empty() {
        println!("{}", "No remotes configured".yellow());
        println!();
        println!("Run {} to add one.", "git remote add <name> <url>".cyan());
        return Ok(());
    }

    println!("{}", "Remotes".bold());
    for remote in &remotes {
        println!();
        println!("  {} {}", "+".green(), remote.cyan());
        let specs = client.configured_fetch_refspecs(remote)?;
        if specs.is_empty() {
            println!("    {}", "(no fetch ref-specs)".dimmed());
        }
        for spec in specs {
            println!("    {}", spec.to_string().dimmed());
        }
    }

    Ok(())
}
