//! `vigil update` and `vigil rollback` command handlers

use std::path::Path;

use tracing::info;

use vigil_core::config::VigilConfig;
use vigil_core::types::UpdateMode;

use crate::cli::{RollbackArgs, UpdateArgs};
use crate::error::CliError;
use crate::output::OutputWriter;
use crate::session;

/// Execute the `update` command.
///
/// The report is rendered before the exit status is decided so that a failed
/// or timed-out operation still prints its evidence.
pub async fn execute_update(
    args: UpdateArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mode = if args.force {
        UpdateMode::Forced
    } else {
        UpdateMode::Normal
    };

    let config = VigilConfig::load(config_path).await?;
    let catalog = super::load_catalog(&config).await?;
    super::ensure_component(&catalog, &args.id, mode)?;

    info!(component_id = %args.id, %mode, expected = %args.expected, "starting update");
    let orchestrator = session::open(&config, catalog).await?;
    let result = match mode {
        UpdateMode::Forced => {
            orchestrator
                .force_update(&args.id, args.before.as_deref(), &args.expected)
                .await
        }
        _ => {
            orchestrator
                .update(&args.id, args.before.as_deref(), &args.expected)
                .await
        }
    };
    session::close(orchestrator).await;

    let report = result?;
    writer.render(&report)?;
    super::outcome_status(&report)
}

/// Execute the `rollback` command.
pub async fn execute_rollback(
    args: RollbackArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = VigilConfig::load(config_path).await?;
    let catalog = super::load_catalog(&config).await?;
    super::ensure_component(&catalog, &args.id, UpdateMode::Rollback)?;

    info!(component_id = %args.id, expected = %args.expected, "starting rollback");
    let orchestrator = session::open(&config, catalog).await?;
    let result = orchestrator
        .rollback(&args.id, args.before.as_deref(), &args.expected)
        .await;
    session::close(orchestrator).await;

    let report = result?;
    writer.render(&report)?;
    super::outcome_status(&report)
}
