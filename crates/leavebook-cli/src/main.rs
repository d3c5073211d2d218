//! leavebook CLI - record and view team leave from the command line
//!
//! Every command restores the local copy, pulls the shared store once when
//! one is configured, and then acts through the sync engine.

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::check::run_check;
use crate::commands::cleanup::run_cleanup;
use crate::commands::completions::run_completions;
use crate::commands::day::run_day;
use crate::commands::delete::run_delete;
use crate::commands::export::run_export;
use crate::commands::list::run_list;
use crate::commands::month::run_month;
use crate::commands::submit::run_submit;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "leavebook=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = &cli.global;

    match cli.command {
        Some(Commands::Submit {
            name,
            start,
            end,
            allow_overlap,
        }) => run_submit(&name, &start, &end, allow_overlap, options).await?,
        Some(Commands::List { name, json }) => run_list(name.as_deref(), json, options).await?,
        Some(Commands::Day { date, json }) => run_day(date.as_deref(), json, options).await?,
        Some(Commands::Month { month, json }) => {
            run_month(month.as_deref(), json, options).await?;
        }
        Some(Commands::Check {
            name,
            start,
            end,
            exclude,
            json,
        }) => run_check(&name, &start, &end, exclude.as_deref(), json, options).await?,
        Some(Commands::Delete { id }) => run_delete(&id, options).await?,
        Some(Commands::Cleanup { dry_run }) => run_cleanup(dry_run, options).await?,
        Some(Commands::Sync { push }) => run_sync(push, options).await?,
        Some(Commands::Watch) => run_watch(options).await?,
        Some(Commands::Export {
            format,
            output,
            manual,
        }) => run_export(format, output.as_deref(), manual, options).await?,
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
