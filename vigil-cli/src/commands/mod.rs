//! Command handlers -- one module per subcommand

pub mod batch;
pub mod catalog;
pub mod config;
pub mod lock;
pub mod update;
pub mod verify;

use std::sync::Arc;

use vigil_core::catalog::ComponentCatalog;
use vigil_core::config::VigilConfig;
use vigil_core::types::UpdateMode;
use vigil_orchestrator::{BatchReport, OrchestratorError, OutcomeReport};
use vigil_verifier::VerificationSummary;

use crate::error::CliError;

/// Load the catalog named by the configuration.
async fn load_catalog(config: &VigilConfig) -> Result<Arc<ComponentCatalog>, CliError> {
    Ok(Arc::new(ComponentCatalog::load(&config.catalog).await?))
}

/// Reject unknown components and unsupported rollbacks before any session opens.
fn ensure_component(
    catalog: &ComponentCatalog,
    component_id: &str,
    mode: UpdateMode,
) -> Result<(), CliError> {
    let descriptor = catalog.get(component_id).map_err(OrchestratorError::from)?;
    if mode.is_rollback() && !descriptor.can_rollback {
        return Err(OrchestratorError::RollbackNotSupported(component_id.to_owned()).into());
    }
    Ok(())
}

/// Map a finished operation to the process result.
fn outcome_status(report: &OutcomeReport) -> Result<(), CliError> {
    if report.succeeded() {
        Ok(())
    } else if report.timed_out() {
        Err(CliError::TimedOut(report.to_string()))
    } else {
        Err(CliError::VerificationFailed(report.to_string()))
    }
}

/// Map a batch to the process result.
///
/// Timeouts only decide the code when nothing else went wrong.
fn batch_status(batch: &BatchReport) -> Result<(), CliError> {
    if batch.overall_success() {
        return Ok(());
    }
    let summary = format!(
        "{} succeeded, {} failed, {} timed out, {} not attempted",
        batch.succeeded_count(),
        batch.failed_count(),
        batch.timed_out_count(),
        batch.not_attempted_count()
    );
    let summary = match &batch.aborted {
        Some(reason) => format!("{summary} (aborted: {reason})"),
        None => summary,
    };
    if batch.aborted.is_none()
        && batch.failed_count() == 0
        && batch.not_attempted_count() == 0
        && batch.timed_out_count() > 0
    {
        Err(CliError::TimedOut(summary))
    } else {
        Err(CliError::VerificationFailed(summary))
    }
}

/// Map a channel summary to the process result.
fn summary_status(subject: &str, summary: &VerificationSummary) -> Result<(), CliError> {
    if summary.fully_passed() {
        return Ok(());
    }
    let failed: Vec<String> = summary.failures().map(|r| r.channel.to_string()).collect();
    let skipped: Vec<String> = summary.skipped().map(|r| r.channel.to_string()).collect();
    let detail = if failed.is_empty() {
        format!("{subject}: unverified, skipped {}", skipped.join(", "))
    } else {
        format!("{subject}: failed on {}", failed.join(", "))
    };
    Err(CliError::VerificationFailed(detail))
}
