//! Update command implementation
//!
//! Drives the reconcile workflow from the terminal: pre-update workspace
//! check, remote and scope selection, fetch with progress, and the final
//! merge feasibility report.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use reconcile_core::{
    FinishHeader, FinishReport, Progress, Scope, Settings, StageId, StageInput, StageView,
    TaskEvent, TaskHandle, Transition, Workflow, WorkflowStatus, spawn_workspace_check,
};
use reconcile_git::{GitClient, RemoteClient};
use tokio::runtime::Runtime;

use crate::error::{CliError, Result};
use crate::interactive;

/// Options of `reconcile update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub remote: Option<String>,
    pub scope: Option<String>,
    pub yes: bool,
}

/// Run the update workflow. Returns `true` when it finished, `false` when aborted.
pub fn run_update(path: &Path, options: &UpdateOptions) -> Result<bool> {
    let scope = options
        .scope
        .as_deref()
        .map(str::parse::<Scope>)
        .transpose()?;

    let git = GitClient::discover(path)?;
    let mut settings = Settings::load(git.root())?;
    if let Some(remote) = &options.remote {
        settings.default_remote = Some(remote.clone());
    }
    if let Some(scope) = scope {
        settings.default_scope = scope;
    }

    let client: Arc<dyn RemoteClient> = Arc::new(git);
    let runtime = Runtime::new()?;

    if settings.require_clean_workspace && !workspace_ready(&runtime, &client)? {
        return Ok(false);
    }

    let interactive = !options.yes && std::io::stdin().is_terminal();
    let mut workflow = Workflow::start(client, settings, runtime.handle().clone())?;

    while workflow.status() == WorkflowStatus::Running {
        let prompted = interactive && !given_on_command_line(workflow.stage(), options, scope);
        let input = match workflow.render() {
            StageView::ChooseRemote { remotes, default } => match &options.remote {
                Some(remote) => StageInput::Remote(remote.clone()),
                None if interactive => {
                    StageInput::Remote(interactive::choose_remote(&remotes, default.as_deref())?)
                }
                None => StageInput::Continue,
            },
            StageView::SelectScope { default } => match scope {
                Some(scope) => StageInput::Scope(scope),
                None if interactive => StageInput::Scope(interactive::select_scope(default)?),
                None => StageInput::Continue,
            },
            StageView::Fetch { .. } => {
                runtime.block_on(workflow.settle_with(print_progress));
                StageInput::Continue
            }
            StageView::Finish { .. } => {
                runtime.block_on(workflow.settle_with(print_progress));
                if let Some(report) = workflow.finish_report() {
                    print_report(report);
                }
                StageInput::Continue
            }
        };

        match workflow.submit(input)? {
            Transition::Stay(reason) => {
                if !prompted && !workflow.is_busy() {
                    return Err(CliError::user(reason));
                }
                println!("{} {}", "!".yellow().bold(), reason);
            }
            Transition::Abort => {
                println!("{} Update aborted", "!".red().bold());
            }
            Transition::Next(_) | Transition::Done => {}
        }
    }

    Ok(workflow.is_finished())
}

/// Whether the active stage takes its input from a command-line flag
fn given_on_command_line(stage: StageId, options: &UpdateOptions, scope: Option<Scope>) -> bool {
    match stage {
        StageId::ChooseRemote => options.remote.is_some(),
        StageId::SelectScope => scope.is_some(),
        StageId::Fetch | StageId::Finish => true,
    }
}

fn workspace_ready(runtime: &Runtime, client: &Arc<dyn RemoteClient>) -> Result<bool> {
    let mut handle = spawn_workspace_check(runtime.handle(), Arc::clone(client));
    let check = runtime.block_on(wait(&mut handle))?;

    if !check.is_ready() {
        println!("{} {}", "!".yellow().bold(), check.message());
    }
    Ok(check.is_ready())
}

/// Wait for a background task, printing its progress.
async fn wait<T>(handle: &mut TaskHandle<T>) -> Result<T> {
    while let Some(event) = handle.next().await {
        match event {
            TaskEvent::Progress(progress) => print_progress(&progress),
            TaskEvent::Finished(result) => return Ok(result?),
        }
    }
    Err(CliError::user("Background task ended without a result"))
}

fn print_progress(progress: &Progress) {
    match progress {
        Progress::Status(message) => println!("{} {}", "=>".blue().bold(), message),
        Progress::Transfer(stats) => tracing::debug!(
            received = stats.received_objects,
            total = stats.total_objects,
            bytes = stats.received_bytes,
            "Transfer progress"
        ),
        Progress::Evaluated {
            done,
            total,
            reference,
        } => println!(
            "   {} {}",
            format!("[{}/{}]", done, total).dimmed(),
            reference
        ),
    }
}

fn print_report(report: &FinishReport) {
    let header = report.header.to_string();
    let header = match report.header {
        FinishHeader::NoChanges | FinishHeader::Changed => header.green().bold(),
        FinishHeader::UpdateFailed(_) | FinishHeader::MissingInfo => header.yellow().bold(),
        FinishHeader::Error => header.red().bold(),
    };

    println!();
    println!("{}", header);
    if let Some(detail) = &report.detail {
        println!();
        for line in detail.lines() {
            println!("  {}", line.dimmed());
        }
    }

    // The header is already printed; show the rest of the message
    let message = report.message();
    let rest = message
        .strip_prefix(&report.header.to_string())
        .unwrap_or(&message)
        .trim();
    if !rest.is_empty() {
        println!();
        println!("{}", rest);
    }
}
