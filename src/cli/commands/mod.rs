use anyhow::{Context, Result};
use std::path::Path;

use crate::config::QualityReportConfig;
use crate::domain::{load_project, Project};

pub mod check;
pub mod history;
pub mod report;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Load and validate the project at `path` with the configured source settings.
pub fn open_project(path: &Path, config: &QualityReportConfig) -> Result<Project> {
    load_project(path, &config.source_settings("."))
        .with_context(|| format!("Invalid project definition {}", path.display()))
}

pub async fn show_how_to_get_started() -> Result<()> {
    println!("📊 quality-report - Software Quality Metrics");
    println!();
    println!("To get started:");
    println!("  ✅ quality-report check               # Validate project.toml");
    println!("  📊 quality-report report              # Measure and record all metrics");
    println!("  📈 quality-report history <METRIC_ID> # Status history of one metric");
    println!();
    println!("Options:");
    println!("  ⚙️  --config <FILE>   # Use another configuration file");
    println!("  🔍 report --detailed # Include norms and source links");
    println!();
    println!("💡 Start with 'quality-report check' to validate your project definition!");
    Ok(())
}
