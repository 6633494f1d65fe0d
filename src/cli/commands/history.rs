use anyhow::{Context, Result};
use std::path::PathBuf;

use super::Command;
use crate::config::QualityReportConfig;
use crate::history::History;
use crate::report::ReportSummary;

pub struct HistoryCommand {
    pub config: QualityReportConfig,
    pub metric_id: String,
    pub history: Option<PathBuf>,
}

impl HistoryCommand {
    pub fn new(config: QualityReportConfig, metric_id: impl Into<String>) -> Self {
        Self {
            config,
            metric_id: metric_id.into(),
            history: None,
        }
    }

    pub fn with_history(mut self, history: Option<PathBuf>) -> Self {
        self.history = history;
        self
    }
}

impl Command for HistoryCommand {
    async fn execute(&self) -> Result<()> {
        let path = self.history.as_ref().unwrap_or(&self.config.paths.history_file);
        let history = History::load(path)
            .await
            .with_context(|| format!("Cannot read history {}", path.display()))?;

        print!("{}", ReportSummary::format_history(&history, &self.metric_id));
        println!("   {} runs recorded in {}", history.len(), path.display());
        Ok(())
    }
}
