//! mailgate CLI entry point.
//!
//! Commands:
//! - `init`: write a default config file
//! - `status`: show configuration and store status
//! - `run`: start a run for one email
//! - `resume`: answer a pending review request
//! - `pending`: list suspended runs, or show one review request
//! - `prefs`: show or reset a preference namespace

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "mailgate",
    about = "mailgate: an email assistant that asks before it acts",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.mailgate/config.toml
    #[arg(short, long, global = true, env = "MAILGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show configuration and store status
    Status,

    /// Classify an email and act on it, stopping at the first review
    Run {
        /// JSON file with the email (`author`/`to`/`subject`/`email_thread`)
        message: PathBuf,
    },

    /// Resume a suspended run with one review outcome
    Resume {
        run_id: String,

        /// Outcome JSON, e.g. '{"type":"accept"}' or '{"type":"response","args":"..."}'
        outcome: String,
    },

    /// List suspended runs, or print one run's review request
    Pending { run_id: Option<String> },

    /// Show a preference namespace
    Prefs {
        /// triage, response_style, calendar or background
        namespace: String,

        /// Delete the namespace so the next read seeds the default
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON results.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force)?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Run { message } => commands::run::run(config_path, &message).await?,
        Commands::Resume { run_id, outcome } => {
            commands::resume::run(config_path, &run_id, &outcome).await?
        }
        Commands::Pending { run_id } => commands::pending::run(config_path, run_id.as_deref()).await?,
        Commands::Prefs { namespace, reset } => {
            commands::prefs::run(config_path, &namespace, reset).await?
        }
    }

    Ok(())
}
