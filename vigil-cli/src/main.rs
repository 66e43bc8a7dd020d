//! vigil CLI entry point
//!
//! Parses arguments, initializes logging from the `[general]` section, and
//! dispatches to one handler per subcommand. Errors are printed to stderr and
//! mapped to the exit codes documented on [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod session;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use vigil_core::config::{GeneralConfig, VigilConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.config, cli.log_level.as_deref()).await {
        eprintln!("error: {e:#}");
        return ExitCode::from(2);
    }

    let writer = OutputWriter::new(cli.output);
    match dispatch(cli, &writer).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "command failed");
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

/// Logging is configured before the full config is validated, so a missing or
/// invalid file falls back to defaults here and is reported by the command.
async fn init_logging(config_path: &Path, log_level: Option<&str>) -> anyhow::Result<()> {
    let general = match VigilConfig::from_file(config_path).await {
        Ok(mut config) => {
            config.apply_env_overrides();
            config.general
        }
        Err(_) => GeneralConfig::default(),
    };
    logging::init_tracing(&general, log_level)
}

async fn dispatch(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    let config_path = cli.config.as_path();
    match cli.command {
        Commands::Catalog(args) => commands::catalog::execute(args, config_path, writer).await,
        Commands::Update(args) => commands::update::execute_update(args, config_path, writer).await,
        Commands::Rollback(args) => {
            commands::update::execute_rollback(args, config_path, writer).await
        }
        Commands::UpdateAll(args) => {
            commands::batch::execute_update_all(args, config_path, writer).await
        }
        Commands::RollbackBatch(args) => {
            commands::batch::execute_rollback_batch(args, config_path, writer).await
        }
        Commands::Verify(args) => commands::verify::execute_verify(args, config_path, writer).await,
        Commands::Kernel => commands::verify::execute_kernel(config_path, writer).await,
        Commands::Lock(args) => commands::lock::execute(args, config_path, writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, writer).await,
    }
}
