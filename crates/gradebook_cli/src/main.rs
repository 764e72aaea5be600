//! `gradebook` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration (env, then flags), start logging, open the
//!   database and dispatch one command.
//! - Report any failure exactly once and exit non-zero.

mod cli;
mod commands;
mod export;
mod output;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, FreedWeight};
use commands::Session;
use gradebook_core::{init_logging, open_db, FreedWeightPolicy, GradebookConfig};
use log::{error, info};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=command module=cli status=error error={err:#}");
            output::print_error(json, &err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    if let Err(err) = init_logging(config.log_level, &config.log_dir) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let session = Session::new(conn, cli.json, config.freed_weight_policy);

    let command = commands::command_name(&cli.command);
    info!("event=command module=cli status=start command={command}");
    commands::dispatch(&session, cli.command)?;
    info!("event=command module=cli status=ok command={command}");
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<GradebookConfig> {
    let mut config = GradebookConfig::from_env()?;
    if let Some(path) = &cli.db_path {
        config.set_db_path(path)?;
    }
    if let Some(level) = &cli.log_level {
        config.set_log_level(level)?;
    }
    if let Some(policy) = cli.freed_weight {
        config.freed_weight_policy = match policy {
            FreedWeight::Return => FreedWeightPolicy::ReturnToUnallocated,
            FreedWeight::Drop => FreedWeightPolicy::Drop,
        };
    }
    Ok(config)
}
