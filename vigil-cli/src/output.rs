//! Output formatting abstraction for text vs JSON rendering
//!
//! All subcommand output flows through [`OutputWriter`] which handles format switching.
//! Text rendering for the orchestrator's report types lives here because several
//! subcommands share them.

use std::io::Write;

use colored::{ColoredString, Colorize};
use serde::Serialize;

use vigil_orchestrator::{BatchOutcome, BatchReport, LockStatus, OperationState, OutcomeReport};
use vigil_verifier::{ChannelStatus, VerificationResult, VerificationSummary};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    ///
    /// For `Text` format, delegates to `Render::render_text()`.
    /// For `Json` format, serialises via `serde_json`.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        self.render_to(&mut handle, payload)
    }

    fn render_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        payload: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => {
                payload.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, payload)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

fn state_label(state: OperationState) -> ColoredString {
    let label = state.to_string().to_uppercase();
    match state {
        OperationState::Succeeded => label.green().bold(),
        OperationState::TimedOut => label.yellow().bold(),
        OperationState::Failed => label.red().bold(),
        _ => label.normal(),
    }
}

fn status_label(result: &VerificationResult) -> ColoredString {
    match result.status {
        ChannelStatus::Passed => "PASS".green(),
        ChannelStatus::Failed { .. } => "FAIL".red(),
        ChannelStatus::Skipped { .. } => "SKIP".yellow(),
    }
}

fn render_result(w: &mut dyn Write, result: &VerificationResult) -> std::io::Result<()> {
    write!(w, "  {:<8} {}", result.channel.to_string(), status_label(result))?;
    if let Some(actual) = &result.actual_value {
        write!(w, "  actual={actual}")?;
    }
    if let Some(expected) = &result.expected_value {
        write!(w, " expected={expected}")?;
    }
    writeln!(w)?;
    if let Some(reason) = result.reason() {
        writeln!(w, "           {}", reason.dimmed())?;
    }
    for line in &result.evidence {
        writeln!(w, "           | {line}")?;
    }
    Ok(())
}

impl Render for VerificationSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for result in &self.results {
            render_result(w, result)?;
        }
        let verdict = if self.fully_passed() {
            "VERIFIED".green().bold()
        } else if self.failures().next().is_some() {
            "FAILED".red().bold()
        } else {
            "INCONCLUSIVE".yellow().bold()
        };
        writeln!(w, "Result: {verdict}")
    }
}

impl Render for OutcomeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "{} {} ({}): {}",
            "Component".bold(),
            self.component_id.bold(),
            self.mode,
            state_label(self.final_state)
        )?;
        if let Some(cause) = &self.cause {
            writeln!(w, "  Cause: {}", cause.to_string().red())?;
        }
        let elapsed = (self.finished_at - self.started_at).num_seconds();
        writeln!(w, "  Operation: {}", self.operation_id)?;
        writeln!(w, "  Duration: {elapsed}s (timeout {}s)", self.timeout_secs)?;
        if let Some(lock_file) = &self.lock_artifact {
            writeln!(w, "  Lock file left behind: {}", lock_file.yellow())?;
        }
        if !self.remote_available {
            writeln!(w, "  {}", "remote session unavailable".yellow())?;
        }
        if let Some(baseline) = &self.baseline {
            writeln!(w)?;
            writeln!(w, "Baseline:")?;
            render_result(w, baseline)?;
        }
        if !self.verification.results.is_empty() {
            writeln!(w)?;
            writeln!(w, "Verification:")?;
            for result in &self.verification.results {
                render_result(w, result)?;
            }
        }
        writeln!(w)?;
        writeln!(w, "Transitions:")?;
        for t in &self.transitions {
            write!(w, "  {} {} -> {}", t.at.format("%H:%M:%S"), t.from, t.to)?;
            if let Some(note) = &t.note {
                write!(w, "  {}", note.dimmed())?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

impl Render for BatchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{:<12} {:<10} {:<12} Detail", "Component", "Mode", "State")?;
        writeln!(w, "{}", "-".repeat(70))?;
        for entry in &self.entries {
            match &entry.outcome {
                BatchOutcome::Completed(report) => {
                    let detail = report
                        .cause
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    writeln!(
                        w,
                        "{:<12} {:<10} {:<12} {}",
                        entry.component_id,
                        report.mode.to_string(),
                        state_label(report.final_state),
                        detail
                    )?;
                }
                BatchOutcome::NotAttempted { reason } => {
                    writeln!(
                        w,
                        "{:<12} {:<10} {:<12} {}",
                        entry.component_id,
                        "-",
                        "SKIPPED".dimmed(),
                        reason
                    )?;
                }
            }
        }
        writeln!(w)?;
        if let Some(reason) = &self.aborted {
            writeln!(w, "Aborted: {}", reason.red())?;
        }
        writeln!(
            w,
            "Succeeded: {}  Failed: {}  Timed out: {}  Not attempted: {}",
            self.succeeded_count(),
            self.failed_count(),
            self.timed_out_count(),
            self.not_attempted_count()
        )?;
        let overall = if self.overall_success() {
            "SUCCESS".green().bold()
        } else {
            "FAILURE".red().bold()
        };
        writeln!(w, "Overall: {overall}")
    }
}

impl Render for LockStatus {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        match &self.holder {
            Some(holder) => writeln!(w, "Update lock: {} by {holder}", "held".yellow().bold())?,
            None => writeln!(w, "Update lock: {}", "free".green())?,
        }
        if let Some(reason) = &self.remote_unavailable {
            writeln!(w, "Remote lock files: {} ({reason})", "unknown".yellow())?;
            return Ok(());
        }
        writeln!(w)?;
        writeln!(w, "{:<12} {:<10} Lock file", "Component", "Present")?;
        writeln!(w, "{}", "-".repeat(60))?;
        for artifact in &self.artifacts {
            let present = match artifact.present {
                Some(true) => "yes".yellow(),
                Some(false) => "no".green(),
                None => "error".red(),
            };
            writeln!(
                w,
                "{:<12} {:<10} {}",
                artifact.component_id, present, artifact.lock_file
            )?;
            if let Some(error) = &artifact.error {
                writeln!(w, "  {}", error.dimmed())?;
            }
        }
        Ok(())
    }
}
