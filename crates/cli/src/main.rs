//! Deckgen CLI - Main Entry Point
//!
//! Waits on projects and tasks of the Deckgen API, runs lifecycle
//! scenarios and inspects exported decks.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{inspect, run, wait};
use deckgen_e2e::{ApiClient, HarnessConfig};

/// Deckgen CLI - convergence waits and lifecycle checks
#[derive(Parser)]
#[command(name = "deckgen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Harness configuration file
    #[arg(long, env = "DECKGEN_CONFIG", default_value = "deckgen.toml", global = true)]
    config: PathBuf,

    /// Base URL of the deck API (overrides the config file)
    #[arg(long, env = "DECKGEN_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a project to reach a status
    WaitStatus(wait::WaitStatusArgs),

    /// Wait for a task to complete
    WaitTask(wait::WaitTaskArgs),

    /// Run lifecycle scenarios
    Run(run::RunArgs),

    /// Inspect an exported deck
    Inspect(inspect::InspectArgs),

    /// Check API health
    Health,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            std::process::exit(2);
        }
    }
}

/// Run the selected command; `Ok(false)` means the check itself failed
async fn dispatch(cli: Cli) -> anyhow::Result<bool> {
    let mut config = HarnessConfig::load(&cli.config)?;
    tracing::debug!("Configuration source: {}", cli.config.display());
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
        config.validate()?;
    }

    match cli.command {
        Commands::WaitStatus(args) => wait::wait_status(args, &config, cli.format).await,
        Commands::WaitTask(args) => wait::wait_task(args, &config, cli.format).await,
        Commands::Run(args) => run::execute(args, config, cli.format).await,
        Commands::Inspect(args) => inspect::execute(args, cli.format).await,
        Commands::Health => {
            let client = ApiClient::new(&config.base_url, config.request_timeout())?;
            if client.health().await {
                output::print_success(&format!("API is healthy at {}", config.base_url));
                Ok(true)
            } else {
                output::print_warning(&format!("API is not responding at {}", config.base_url));
                Ok(false)
            }
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(true)
        }
    }
}
