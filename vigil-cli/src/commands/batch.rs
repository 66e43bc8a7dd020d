//! `vigil update-all` and `vigil rollback-batch` command handlers

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use vigil_core::config::VigilConfig;
use vigil_core::types::UpdateMode;

use crate::cli::{ExpectationArgs, RollbackBatchArgs, UpdateAllArgs};
use crate::error::CliError;
use crate::output::OutputWriter;
use crate::session;

/// Execute the `update-all` command.
pub async fn execute_update_all(
    args: UpdateAllArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let expectations = collect_expectations(&args.expectations).await?;
    if expectations.is_empty() {
        return Err(CliError::Command(
            "no expected versions given (use --expect ID=VERSION or --expectations-file)"
                .to_owned(),
        ));
    }

    let config = VigilConfig::load(config_path).await?;
    let catalog = super::load_catalog(&config).await?;
    for id in expectations.keys() {
        super::ensure_component(&catalog, id, UpdateMode::Normal)?;
    }

    info!(given = expectations.len(), "starting update-all");
    let orchestrator = session::open(&config, catalog).await?;
    let result = orchestrator.update_all(&expectations).await;
    session::close(orchestrator).await;

    let batch = result?;
    writer.render(&batch)?;
    super::batch_status(&batch)
}

/// Execute the `rollback-batch` command.
pub async fn execute_rollback_batch(
    args: RollbackBatchArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let expectations = collect_expectations(&args.expectations).await?;

    let config = VigilConfig::load(config_path).await?;
    let catalog = super::load_catalog(&config).await?;
    for id in &args.ids {
        super::ensure_component(&catalog, id, UpdateMode::Rollback)?;
    }

    info!(components = args.ids.len(), "starting rollback batch");
    let orchestrator = session::open(&config, catalog).await?;
    let result = orchestrator.rollback_batch(&args.ids, &expectations).await;
    session::close(orchestrator).await;

    let batch = result?;
    writer.render(&batch)?;
    super::batch_status(&batch)
}

/// Merge the expectations file with `--expect` flags; flags win.
async fn collect_expectations(
    args: &ExpectationArgs,
) -> Result<BTreeMap<String, String>, CliError> {
    let mut expectations = BTreeMap::new();

    if let Some(path) = &args.expectations_file {
        debug!(path = %path.display(), "reading expectations file");
        let raw = tokio::fs::read_to_string(path).await?;
        let from_file: BTreeMap<String, String> = toml::from_str(&raw).map_err(|e| {
            CliError::Config(format!(
                "invalid expectations file {}: {}",
                path.display(),
                e
            ))
        })?;
        expectations.extend(from_file);
    }

    expectations.extend(args.expect.iter().cloned());
    Ok(expectations)
}
