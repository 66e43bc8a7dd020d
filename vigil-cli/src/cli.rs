//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// vigil -- drive appliance component updates through the web console and
/// verify them over three independent channels.
///
/// Use `vigil <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about, long_about = None)]
pub struct Cli {
    /// Path to the vigil.toml configuration file.
    #[arg(short, long, global = true, default_value = "vigil.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect the component catalog.
    Catalog(CatalogArgs),

    /// Run a normal (or forced) update of one component and verify it.
    Update(UpdateArgs),

    /// Roll one component back to its previous version and verify it.
    Rollback(RollbackArgs),

    /// Update every catalog component in order (patterns first, engines last).
    UpdateAll(UpdateAllArgs),

    /// Roll back a list of components in the given order.
    RollbackBatch(RollbackBatchArgs),

    /// Verify a component version without triggering anything.
    Verify(VerifyArgs),

    /// Check the kernel version shown in the console against `uname -r`.
    Kernel,

    /// Inspect or clear update locks.
    Lock(LockArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- catalog ----

/// Inspect the component catalog.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub action: CatalogAction,
}

#[derive(Subcommand, Debug)]
pub enum CatalogAction {
    /// List catalog components.
    List {
        /// Filter by category (pattern, engine).
        #[arg(long)]
        category: Option<String>,

        /// Only show components that support rollback.
        #[arg(long)]
        rollback_only: bool,
    },
    /// Show one component descriptor.
    Show {
        /// Component identifier (e.g. PTN).
        id: String,
    },
}

// ---- update / rollback ----

/// Trigger an update and wait for it to complete.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Component identifier (e.g. PTN).
    pub id: String,

    /// Version expected after the update.
    #[arg(short, long)]
    pub expected: String,

    /// Version expected before the update (checked as a non-fatal baseline).
    #[arg(long)]
    pub before: Option<String>,

    /// Reapply the update even when the version is already current.
    #[arg(short, long)]
    pub force: bool,
}

/// Trigger a rollback and wait for it to complete.
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Component identifier (e.g. PTN).
    pub id: String,

    /// Version expected after the rollback.
    #[arg(short, long)]
    pub expected: String,

    /// Version expected before the rollback (checked as a non-fatal baseline).
    #[arg(long)]
    pub before: Option<String>,
}

// ---- batches ----

/// Update every catalog component.
#[derive(Args, Debug)]
pub struct UpdateAllArgs {
    #[command(flatten)]
    pub expectations: ExpectationArgs,
}

/// Roll back several components in sequence.
#[derive(Args, Debug)]
pub struct RollbackBatchArgs {
    /// Component identifiers, processed in the given order.
    #[arg(required = true)]
    pub ids: Vec<String>,

    #[command(flatten)]
    pub expectations: ExpectationArgs,
}

/// Expected versions for a batch run.
#[derive(Args, Debug)]
pub struct ExpectationArgs {
    /// Expected version as ID=VERSION (repeatable).
    #[arg(long = "expect", value_name = "ID=VERSION", value_parser = parse_expectation)]
    pub expect: Vec<(String, String)>,

    /// TOML file mapping component ids to expected versions.
    #[arg(long, value_name = "PATH")]
    pub expectations_file: Option<PathBuf>,
}

// ---- verify ----

/// Run the UI, backend and log checks for one component.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Component identifier (e.g. PTN).
    pub id: String,

    /// Version the component should report.
    #[arg(short, long)]
    pub expected: String,

    /// How far back (seconds) the update log window reaches.
    #[arg(long)]
    pub lookback_secs: Option<u64>,
}

// ---- lock ----

/// Inspect or clear update locks.
#[derive(Args, Debug)]
pub struct LockArgs {
    #[command(subcommand)]
    pub action: LockAction,
}

#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Show the in-process lock holder and remote lock files.
    Status,
    /// Remove a stale remote lock file for one component.
    Clear {
        /// Component identifier (e.g. PTN).
        id: String,
    },
}

// ---- config ----

/// Manage vigil configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, target, remote, browser, ui, verify, catalog).
        #[arg(long)]
        section: Option<String>,
    },
}

/// Parse an `ID=VERSION` pair.
pub fn parse_expectation(raw: &str) -> Result<(String, String), String> {
    let (id, version) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VERSION, got '{raw}'"))?;
    let id = id.trim();
    let version = version.trim();
    if id.is_empty() || version.is_empty() {
        return Err(format!("expected ID=VERSION, got '{raw}'"));
    }
    Ok((id.to_owned(), version.to_owned()))
}
