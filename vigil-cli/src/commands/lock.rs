//! `vigil lock` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use vigil_core::config::VigilConfig;
use vigil_core::types::UpdateMode;

use crate::cli::{LockAction, LockArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::session;

/// Execute the `lock` command.
pub async fn execute(
    args: LockArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = VigilConfig::load(config_path).await?;
    let catalog = super::load_catalog(&config).await?;

    match args.action {
        LockAction::Status => {
            let orchestrator = session::open(&config, catalog).await?;
            let status = orchestrator.lock_status().await;
            session::close(orchestrator).await;
            writer.render(&status)?;
            Ok(())
        }
        LockAction::Clear { id } => {
            super::ensure_component(&catalog, &id, UpdateMode::Normal)?;
            let orchestrator = session::open(&config, catalog).await?;
            let result = orchestrator.clear_lock(&id).await;
            session::close(orchestrator).await;

            let removed = result?;
            info!(component_id = %id, removed, "lock clear finished");
            writer.render(&LockClearReport {
                component_id: id,
                removed,
            })?;
            Ok(())
        }
    }
}

/// Result of clearing one remote lock file.
#[derive(Serialize)]
pub struct LockClearReport {
    pub component_id: String,
    /// A lock file existed and was removed
    pub removed: bool,
}

impl Render for LockClearReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.removed {
            writeln!(
                w,
                "Lock file for {} {}",
                self.component_id.bold(),
                "removed".green()
            )
        } else {
            writeln!(w, "No lock file present for {}", self.component_id.bold())
        }
    }
}
