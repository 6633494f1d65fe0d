//! Report assembly: sections of metrics built from a project, the run
//! orchestrator and the structured and text output of a run.

pub mod builder;
pub mod output;
pub mod run;
pub mod section;
pub mod summary;

pub use builder::{build_sections, DOCUMENTS_SHORT_NAME};
pub use output::{ReportOutput, SectionOutput};
pub use run::{ReportRunner, DEFAULT_MAX_CONCURRENT_FETCHES};
pub use section::{Section, SectionHeader};
pub use summary::ReportSummary;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{Dashboard, Project};
use crate::metric::{Metric, RunContext, Status};

/// All sections of one report, in output order.
#[derive(Debug)]
pub struct QualityReport {
    project: Arc<Project>,
    sections: Vec<Section>,
}

impl QualityReport {
    pub fn new(project: Arc<Project>, sections: Vec<Section>) -> Self {
        Self { project, sections }
    }

    pub fn from_project(project: Arc<Project>) -> Self {
        let sections = build_sections(&project);
        Self::new(project, sections)
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.project.dashboard()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id_prefix: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id_prefix() == id_prefix)
    }

    /// Every metric, in section then construction order.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.sections.iter().flat_map(|section| section.metrics().iter())
    }

    pub fn metric(&self, id: &str) -> Option<&Metric> {
        self.metrics().find(|metric| metric.id() == id)
    }

    pub fn metric_count(&self) -> usize {
        self.sections.iter().map(Section::len).sum()
    }

    pub async fn counts_by_status(&self, ctx: &RunContext) -> BTreeMap<Status, usize> {
        let mut counts: BTreeMap<Status, usize> = Status::ALL.into_iter().map(|status| (status, 0)).collect();
        for metric in self.metrics() {
            *counts.entry(metric.status(ctx).await).or_insert(0) += 1;
        }
        counts
    }
}
