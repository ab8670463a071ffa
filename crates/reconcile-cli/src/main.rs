//! Reconcile CLI
//!
//! Updates a local repository from a remote and reports whether the fetched
//! changes can be merged.

mod cli;
mod commands;
mod error;
mod interactive;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use commands::UpdateOptions;
use error::Result;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: failed to initialise logging: {}", "warning".yellow(), e);
    }
    tracing::debug!("Verbose mode enabled");

    let path = match cli.path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Some(cmd) => execute_command(cmd, path),
        None => {
            println!("{} Fetch reconciliation", "reconcile".green().bold());
            println!();
            println!("Run {} for available commands.", "reconcile --help".cyan());
            Ok(true)
        }
    }
}

fn execute_command(cmd: Commands, path: PathBuf) -> Result<bool> {
    match cmd {
        Commands::Update { remote, scope, yes } => {
            commands::run_update(&path, &UpdateOptions { remote, scope, yes })
        }
        Commands::Status => commands::run_status(&path),
        Commands::Remotes => commands::run_remotes(&path).map(|()| true),
    }
}
