//! shieldpost -- report OSSEC firewall drops to DShield.
//!
//! Typically run from cron:
//!
//! ```text
//! */30 * * * * shieldpost --config /etc/shieldpost.toml submit
//! ```

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use shieldpost_core::config::{GeneralConfig, ShieldpostConfig};

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let general = logging_config(&cli).await;
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    shieldpost_core::metrics::describe_all();

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = run(cli, &writer).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    let config_path = cli.config;
    match cli.command {
        Commands::Submit(args) => commands::submit::execute(args, &config_path, writer).await,
        Commands::Parse(args) => commands::parse::execute(args, &config_path, writer).await,
        Commands::State(args) => commands::state::execute(args, &config_path, writer).await,
        Commands::Config(args) => commands::config::execute(args, &config_path, writer).await,
    }
}

/// Resolve the `[general]` section before logging exists.
///
/// A broken or missing file falls back to defaults here; the command itself
/// reports the real configuration error afterwards.
async fn logging_config(cli: &Cli) -> GeneralConfig {
    let mut general = match ShieldpostConfig::from_file_or_default(&cli.config).await {
        Ok(mut config) => {
            config.apply_env_overrides();
            config.general
        }
        Err(_) => GeneralConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    general
}
