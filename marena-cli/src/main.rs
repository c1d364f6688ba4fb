//! marena CLI - interactive client for the marena memory arena.

mod command;
mod commands;
mod observability;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marena_core::{ArenaConfig, MemoryService};
use observability::{TracingConfig, init_tracing};
use session::Session;
use std::path::PathBuf;
use std::sync::Arc;

/// marena - reference-counted, compacting memory arena.
#[derive(Parser)]
#[command(name = "marena")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML arena configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Arena size in megabytes (overrides the configuration file)
    #[arg(short, long, global = true)]
    memory_mb: Option<u64>,

    /// Directory for summary and dump files (overrides the configuration file)
    #[arg(short, long, global = true)]
    dump_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands interactively from stdin (default)
    Repl,

    /// Execute commands from a script file
    Run {
        /// Path to the script
        file: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<ArenaConfig> {
    let mut config = match &cli.config {
        Some(path) => ArenaConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ArenaConfig::default(),
    };

    if let Some(memory_mb) = cli.memory_mb {
        config = config.with_memory_mb(memory_mb);
    }
    if let Some(dir) = &cli.dump_dir {
        config = config.with_dump_directory(dir);
    }

    config.validate().context("Invalid arena configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = init_tracing(TracingConfig::from_env(cli.verbose))?;

    let config = load_config(&cli)?;
    let service = MemoryService::new(&config).context("Failed to start arena")?;
    let session = Session::new(Arc::new(service));

    tracing::info!(
        capacity = config.capacity(),
        dump_directory = ?config.dump_directory,
        "Arena started"
    );

    let result = match &cli.command {
        None | Some(Commands::Repl) => commands::repl::run(&session).await,
        Some(Commands::Run { file }) => commands::run::run(&session, file).await,
    };

    // Drain pending collection before exit so the final summary is accurate.
    let service = Arc::clone(session.service());
    tokio::task::spawn_blocking(move || service.manager().stop_collector())
        .await
        .context("Collector shutdown task failed")?;

    result
}
