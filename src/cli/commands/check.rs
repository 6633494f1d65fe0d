use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{open_project, Command};
use crate::config::QualityReportConfig;
use crate::report::QualityReport;

pub struct CheckCommand {
    pub config: QualityReportConfig,
    pub project: Option<PathBuf>,
}

impl CheckCommand {
    pub fn new(config: QualityReportConfig) -> Self {
        Self { config, project: None }
    }

    pub fn with_project(mut self, project: Option<PathBuf>) -> Self {
        self.project = project;
        self
    }
}

impl Command for CheckCommand {
    async fn execute(&self) -> Result<()> {
        let path = self.project.as_ref().unwrap_or(&self.config.paths.project_file);
        print!("🔍 Checking {}... ", path.display());

        let project = match open_project(path, &self.config) {
            Ok(project) => project,
            Err(e) => {
                println!("❌");
                return Err(e);
            }
        };
        println!("✅");

        let report = QualityReport::from_project(Arc::new(project));
        println!();
        println!("📋 {} ({})", report.project().name(), report.project().organization());
        for section in report.sections() {
            println!(
                "   {} {:<24} {} metrics",
                section.id_prefix(),
                section.title(),
                section.len()
            );
        }
        println!();
        println!(
            "✅ {} metrics in {} sections",
            report.metric_count(),
            report.sections().len()
        );
        Ok(())
    }
}
