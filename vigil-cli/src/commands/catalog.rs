//! `vigil catalog` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use vigil_core::catalog::{Category, ComponentCatalog, ComponentDescriptor};
use vigil_core::config::VigilConfig;
use vigil_core::error::VigilError;

use crate::cli::{CatalogAction, CatalogArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `catalog` command.
///
/// Uses the catalog configured in `config_path` when that file exists and
/// the embedded catalog otherwise, so the command works before any
/// configuration is written.
pub async fn execute(
    args: CatalogArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let (source, catalog) = resolve_catalog(config_path).await?;

    match args.action {
        CatalogAction::List {
            category,
            rollback_only,
        } => {
            let category = category.as_deref().map(parse_category).transpose()?;
            let report = build_list(&catalog, source, category, rollback_only);
            writer.render(&report)?;
        }
        CatalogAction::Show { id } => {
            let descriptor = catalog
                .get(&id)
                .map_err(|e| CliError::Core(VigilError::from(e)))?;
            writer.render(descriptor)?;
        }
    }
    Ok(())
}

async fn resolve_catalog(config_path: &Path) -> Result<(String, ComponentCatalog), CliError> {
    if tokio::fs::try_exists(config_path).await? {
        let config = VigilConfig::load(config_path).await?;
        let source = config
            .catalog
            .path
            .clone()
            .unwrap_or_else(|| "embedded".to_owned());
        let catalog = ComponentCatalog::load(&config.catalog).await?;
        Ok((source, catalog))
    } else {
        debug!(path = %config_path.display(), "config file absent, using embedded catalog");
        let catalog = ComponentCatalog::load_default().map_err(VigilError::from)?;
        Ok(("embedded".to_owned(), catalog))
    }
}

fn parse_category(raw: &str) -> Result<Category, CliError> {
    match raw {
        "pattern" => Ok(Category::Pattern),
        "engine" => Ok(Category::Engine),
        other => Err(CliError::Command(format!(
            "unknown category: {} (expected: pattern, engine)",
            other
        ))),
    }
}

fn build_list(
    catalog: &ComponentCatalog,
    source: String,
    category: Option<Category>,
    rollback_only: bool,
) -> CatalogListReport {
    let components = catalog
        .all()
        .iter()
        .filter(|d| category.is_none_or(|c| d.category == c))
        .filter(|d| !rollback_only || d.can_rollback)
        .map(|d| ComponentRow {
            id: d.id.clone(),
            display_name: d.display_name.clone(),
            category: d.category,
            can_rollback: d.can_rollback,
            update_timeout_secs: d.update_timeout_secs,
            rollback_timeout_secs: d.rollback_timeout_secs,
        })
        .collect();
    CatalogListReport { source, components }
}

/// Catalog listing.
#[derive(Serialize)]
pub struct CatalogListReport {
    /// `embedded` or the override file path
    pub source: String,
    pub components: Vec<ComponentRow>,
}

#[derive(Serialize)]
pub struct ComponentRow {
    pub id: String,
    pub display_name: String,
    pub category: Category,
    pub can_rollback: bool,
    pub update_timeout_secs: u64,
    pub rollback_timeout_secs: u64,
}

impl Render for CatalogListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Catalog: {}", self.source.bold())?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<12} {:<10} {:<10} {:>8}  Name",
            "ID", "Category", "Rollback", "Timeout"
        )?;
        writeln!(w, "{}", "-".repeat(72))?;
        for c in &self.components {
            let rollback = if c.can_rollback {
                "yes".green()
            } else {
                "no".red()
            };
            writeln!(
                w,
                "{:<12} {:<10} {:<10} {:>7}s  {}",
                c.id,
                c.category.to_string(),
                rollback,
                c.update_timeout_secs,
                c.display_name
            )?;
        }
        writeln!(w)?;
        writeln!(w, "{} component(s)", self.components.len())
    }
}

impl Render for ComponentDescriptor {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{} ({})", self.id.bold(), self.display_name)?;
        writeln!(w, "  Category:        {}", self.category)?;
        writeln!(w, "  Priority:        {}", self.priority)?;
        writeln!(w, "  UI label:        {}", self.ui_label)?;
        writeln!(w, "  Version key:     {}", self.version_store_key)?;
        writeln!(w, "  Timestamp key:   {}", self.version_timestamp_key)?;
        writeln!(w, "  Lock file:       {}", self.lock_file)?;
        writeln!(w, "  Service:         {}", self.service)?;
        writeln!(w, "  Log tag:         {}", self.log_tag)?;
        writeln!(w, "  Restart needed:  {}", self.requires_service_restart)?;
        writeln!(w, "  Update timeout:  {}s", self.update_timeout_secs)?;
        if self.can_rollback {
            writeln!(w, "  Rollback:        {} ({}s)", "yes".green(), self.rollback_timeout_secs)?;
        } else {
            writeln!(w, "  Rollback:        {}", "not supported".red())?;
        }
        for pattern in &self.success_patterns {
            writeln!(w, "  Success pattern: {}", pattern)?;
        }
        Ok(())
    }
}
