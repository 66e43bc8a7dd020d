//! `vigil verify` and `vigil kernel` command handlers

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use vigil_core::config::VigilConfig;
use vigil_core::types::UpdateMode;
use vigil_verifier::VerificationSummary;

use crate::cli::VerifyArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::session;

/// Execute the `verify` command.
///
/// Nothing is triggered on the appliance; the three channels are read only.
pub async fn execute_verify(
    args: VerifyArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = VigilConfig::load(config_path).await?;
    let catalog = super::load_catalog(&config).await?;
    super::ensure_component(&catalog, &args.id, UpdateMode::Normal)?;

    info!(component_id = %args.id, expected = %args.expected, "verifying component");
    let orchestrator = session::open(&config, catalog).await?;
    let result = orchestrator
        .verify_only(&args.id, &args.expected, args.lookback_secs)
        .await;
    session::close(orchestrator).await;

    let report = VerifyReport {
        subject: args.id,
        expected: Some(args.expected),
        verified: false,
        summary: result?,
    }
    .settle();
    writer.render(&report)?;
    super::summary_status(&report.subject, &report.summary)
}

/// Execute the `kernel` command.
pub async fn execute_kernel(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    let config = VigilConfig::load(config_path).await?;
    let catalog = super::load_catalog(&config).await?;

    info!("checking kernel version");
    let orchestrator = session::open(&config, catalog).await?;
    let summary = orchestrator.check_kernel().await;
    session::close(orchestrator).await;

    let report = VerifyReport {
        subject: "kernel".to_owned(),
        expected: None,
        verified: false,
        summary,
    }
    .settle();
    writer.render(&report)?;
    super::summary_status(&report.subject, &report.summary)
}

/// Read-only verification report.
#[derive(Serialize)]
pub struct VerifyReport {
    /// Component id, or `kernel`
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Every channel attempted and passed
    pub verified: bool,
    #[serde(flatten)]
    pub summary: VerificationSummary,
}

impl VerifyReport {
    fn settle(mut self) -> Self {
        self.verified = self.summary.fully_passed();
        self
    }
}

impl Render for VerifyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.expected {
            Some(expected) => writeln!(
                w,
                "Verify {} (expected {})",
                self.subject.bold(),
                expected.bold()
            )?,
            None => writeln!(w, "Verify {}", self.subject.bold())?,
        }
        self.summary.render_text(w)
    }
}
