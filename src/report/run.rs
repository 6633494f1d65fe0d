use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info, Instrument};

use super::output::{count_by_status, host_name, ReportOutput, SectionOutput};
use super::QualityReport;
use crate::clock::Clock;
use crate::domain::Project;
use crate::history::{History, HistoryEntry, MetricRecord};
use crate::metric::{MetricResult, RunContext};
use crate::observability::OperationTimer;
use crate::telemetry::{create_run_span, generate_run_id};

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Runs one report: evaluates every metric, appends the run to the history
/// and assembles the output.
pub struct ReportRunner {
    clock: Arc<dyn Clock>,
    max_concurrent_fetches: usize,
}

impl ReportRunner {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    pub fn with_max_concurrent_fetches(mut self, max_concurrent_fetches: usize) -> Self {
        self.max_concurrent_fetches = max_concurrent_fetches.max(1);
        self
    }

    pub async fn run(&self, project: Arc<Project>, history: &mut History) -> ReportOutput {
        let run_id = generate_run_id();
        let span = create_run_span(project.name(), &run_id);
        self.run_inner(project, history, run_id).instrument(span).await
    }

    async fn run_inner(&self, project: Arc<Project>, history: &mut History, run_id: String) -> ReportOutput {
        let now = self.clock.now();
        let ctx = RunContext::new(now);
        let report = QualityReport::from_project(Arc::clone(&project));
        info!(metrics = report.metric_count(), sections = report.sections().len(), "Starting report run");

        // Fetches overlap; results come back in metric order.
        let timer = OperationTimer::new("evaluate_metrics");
        let results: Vec<MetricResult> = {
            let history: &History = history;
            stream::iter(report.metrics())
                .map(|metric| metric.evaluate(&ctx, history))
                .buffered(self.max_concurrent_fetches)
                .collect()
                .await
        };
        timer.finish();

        let entry = results.iter().fold(HistoryEntry::new(now), |entry, result| {
            entry.with_metric(
                result.id.clone(),
                MetricRecord {
                    value: result.value,
                    status: result.status,
                    timestamp: result.status_start_date,
                },
            )
        });
        let history_recorded = match history.record(entry).await {
            Ok(recorded) => recorded,
            Err(e) => {
                error!(error = %e, "Failed to record history, report is still produced");
                false
            }
        };

        ctx.cache().log_stats();
        let counts_by_status = count_by_status(&results);
        info!(counts = ?counts_by_status, "Report run finished");

        let mut remaining = results.into_iter();
        let sections = report
            .sections()
            .iter()
            .map(|section| SectionOutput {
                header: section.header().clone(),
                metrics: remaining.by_ref().take(section.len()).collect(),
            })
            .collect();

        ReportOutput {
            project: project.name().to_string(),
            organization: project.organization().to_string(),
            run_id,
            timestamp: now,
            host: host_name(),
            metric_count: report.metric_count(),
            counts_by_status,
            dashboard: project.dashboard().cloned(),
            sections,
            history: history.status_count_series(),
            source_queries: ctx.cache().stats(),
            history_recorded,
        }
    }
}
