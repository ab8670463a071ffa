//! Interactive prompts for the update command
//!
//! Uses dialoguer for terminal-based selection.

use dialoguer::{Input, Select};
use reconcile_core::Scope;

use crate::error::Result;

const ENTER_URL: &str = "Enter a URL...";

/// Scopes offered in the scope prompt, with their labels
const SCOPES: &[(Scope, &str)] = &[
    (Scope::Workspace, "workspace - only the current branch"),
    (Scope::Workflow, "workflow - every branch the remote is configured to fetch"),
];

/// Ask for a remote, preselecting `default`. Returns a remote name or URL.
pub fn choose_remote(remotes: &[String], default: Option<&str>) -> Result<String> {
    let mut items: Vec<&str> = remotes.iter().map(String::as_str).collect();
    items.push(ENTER_URL);

    let preselected = default
        .and_then(|d| remotes.iter().position(|r| r == d))
        .unwrap_or(0);
    let index = Select::new()
        .with_prompt("Remote repository")
        .items(&items)
        .default(preselected)
        .interact()?;

    if index < remotes.len() {
        return Ok(remotes[index].clone());
    }
    let url: String = Input::new().with_prompt("Remote URL").interact_text()?;
    Ok(url)
}

/// Ask for the update scope, preselecting `default`.
pub fn select_scope(default: Scope) -> Result<Scope> {
    let labels: Vec<&str> = SCOPES.iter().map(|(_, label)| *label).collect();
    let preselected = SCOPES.iter().position(|(s, _)| *s == default).unwrap_or(0);

    let index = Select::new()
        .with_prompt("Update scope")
        .items(&labels)
        .default(preselected)
        .interact()?;
    Ok(SCOPES[index].0)
}
