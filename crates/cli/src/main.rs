//! auditcoal - replay and inspect coalesced shared directory audit logs

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::cmd;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// auditcoal - Coalesce shared directory access into audit records
#[derive(Parser)]
#[command(name = "auditcoal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded occurrences through the trackers into a journal
    Replay {
        /// JSON-lines file of occurrences
        #[arg(short, long)]
        input: PathBuf,
        /// Journal directory (created if missing)
        #[arg(short, long)]
        journal: PathBuf,
        /// Tracker configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Session id stamped on occurrences that lack one
        #[arg(long, default_value = "replay")]
        session: String,
    },
    /// Show journaled audit records
    Log {
        /// Journal directory
        #[arg(short, long)]
        journal: PathBuf,
        /// Number of records to show (default: 20)
        #[arg(long)]
        limit: Option<usize>,
        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Show the effective tracker configuration
    Config {
        /// Tracker configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { input, journal, config, session } => {
            cmd::replay::run(&input, &journal, config.as_deref(), &session).await
        }
        Commands::Log { journal, limit, json } => cmd::log::run(&journal, limit, json).await,
        Commands::Config { config } => cmd::config::run(config.as_deref()).await,
    }
}
