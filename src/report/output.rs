use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::section::SectionHeader;
use crate::domain::Dashboard;
use crate::history::StatusCounts;
use crate::metric::{MetricResult, Status};
use crate::observability::SourceQueryStats;

#[derive(Debug, Clone, Serialize)]
pub struct SectionOutput {
    #[serde(flatten)]
    pub header: SectionHeader,
    pub metrics: Vec<MetricResult>,
}

/// Structured result of one report run, rendered by an external front end.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub project: String,
    pub organization: String,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub host: String,
    pub metric_count: usize,
    pub counts_by_status: BTreeMap<Status, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<Dashboard>,
    pub sections: Vec<SectionOutput>,
    /// Metrics per status for every recorded run, oldest first.
    pub history: Vec<StatusCounts>,
    pub source_queries: SourceQueryStats,
    pub history_recorded: bool,
}

impl ReportOutput {
    pub fn metrics(&self) -> impl Iterator<Item = &MetricResult> {
        self.sections.iter().flat_map(|section| section.metrics.iter())
    }

    pub fn metric(&self, id: &str) -> Option<&MetricResult> {
        self.metrics().find(|metric| metric.id == id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Count of metrics per status, with every status present.
pub fn count_by_status<'a>(metrics: impl IntoIterator<Item = &'a MetricResult>) -> BTreeMap<Status, usize> {
    let mut counts: BTreeMap<Status, usize> = Status::ALL.into_iter().map(|status| (status, 0)).collect();
    for metric in metrics {
        *counts.entry(metric.status).or_insert(0) += 1;
    }
    counts
}

pub fn host_name() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}
