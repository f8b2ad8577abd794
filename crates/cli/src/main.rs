//! Emberline command-line entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use emberline_config::AppConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emberline", version, about = "Autonomous outreach pipeline")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "emberline.toml")]
    config: PathBuf,

    /// Enable debug-level logging.
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server, scheduler, and webhooks.
    Serve {
        /// Override the configured listen port.
        #[arg(long, env = "EMBERLINE_PORT")]
        port: Option<u16>,
    },
    /// Run a single discovery cycle and exit.
    Cycle,
    /// Show the remaining campaign budget.
    Budget,
    /// Print a default configuration file to stdout.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    if matches!(cli.command, Command::InitConfig) {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            emberline_server::run(config).await
        }
        Command::Cycle => {
            let services = emberline_server::build_services(&config)?;
            match services.orchestrator.run_cycle().await {
                Some(report) => {
                    info!(
                        triggers = report.triggers,
                        succeeded = report.succeeded,
                        failed = report.failed,
                        remaining_budget = services.ledger.remaining(),
                        "cycle complete"
                    );
                }
                None => info!("cycle skipped: budget too low"),
            }
            Ok(())
        }
        Command::Budget => {
            let services = emberline_server::build_services(&config)?;
            println!(
                "remaining: ${:.2} (spent ${:.2})",
                services.ledger.remaining(),
                services.ledger.spent()
            );
            Ok(())
        }
        Command::InitConfig => unreachable!(),
    }
}
