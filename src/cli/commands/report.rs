use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use super::{open_project, Command};
use crate::clock::SystemClock;
use crate::config::QualityReportConfig;
use crate::history::History;
use crate::report::{ReportRunner, ReportSummary};

pub struct ReportCommand {
    pub config: QualityReportConfig,
    pub project: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub detailed: bool,
}

impl ReportCommand {
    pub fn new(config: QualityReportConfig) -> Self {
        Self {
            config,
            project: None,
            history: None,
            output: None,
            detailed: false,
        }
    }

    pub fn with_project(mut self, project: Option<PathBuf>) -> Self {
        self.project = project;
        self
    }

    pub fn with_history(mut self, history: Option<PathBuf>) -> Self {
        self.history = history;
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_detailed(mut self, detailed: bool) -> Self {
        self.detailed = detailed;
        self
    }
}

impl Command for ReportCommand {
    async fn execute(&self) -> Result<()> {
        let project_file = self.project.as_ref().unwrap_or(&self.config.paths.project_file);
        let history_file = self.history.as_ref().unwrap_or(&self.config.paths.history_file);
        let output_file = self.output.as_ref().or(self.config.paths.output_file.as_ref());

        let project = Arc::new(open_project(project_file, &self.config)?);
        let mut history = History::load(history_file)
            .await
            .with_context(|| format!("Cannot read history {}", history_file.display()))?;

        let output = ReportRunner::new(Arc::new(SystemClock))
            .with_max_concurrent_fetches(self.config.engine.max_concurrent_fetches)
            .run(project, &mut history)
            .await;

        let json = output.to_json().context("Cannot serialize report")?;
        let summary = ReportSummary::format_report(&output, self.detailed);
        match output_file {
            Some(path) => {
                tokio::fs::write(path, json)
                    .await
                    .with_context(|| format!("Cannot write report {}", path.display()))?;
                print!("{summary}");
                println!("📁 Report written to {}", path.display());
            }
            None => {
                // JSON owns stdout.
                println!("{json}");
                eprint!("{summary}");
            }
        }
        Ok(())
    }
}
