//! Status command implementation

use std::path::Path;

use colored::Colorize;
use reconcile_core::check_workspace;
use reconcile_git::GitClient;

use crate::error::Result;

/// Run the status command. Returns whether an update could start.
pub fn run_status(path: &Path) -> Result<bool> {
    let client = GitClient::discover(path)?;
    let check = check_workspace(&client)?;

    println!("{}", "Workspace Status".bold());
    println!();
    println!("{}:   {}", "Path".dimmed(), client.root().display());
    println!();

    if check.is_ready() {
        println!("{} {}", "OK".green().bold(), check.message());
    } else {
        println!("{}", "Local changes:".yellow().bold());
        for (status, count) in &check.status.counts {
            println!("  {} {}", format!("{}:", status.title()).dimmed(), count);
        }
        println!();
        println!(
            "Record or discard these changes before running {}.",
            "reconcile update".cyan()
        );
    }

    Ok(check.is_ready())
}
