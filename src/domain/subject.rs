use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::requirement::Requirement;
use super::target::DebtTarget;
use crate::metric::MetricKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Project,
    Product,
    Team,
    Environment,
    Document,
}

impl SubjectKind {
    pub fn label(self) -> &'static str {
        match self {
            SubjectKind::Project => "Project",
            SubjectKind::Product => "Product",
            SubjectKind::Team => "Team",
            SubjectKind::Environment => "Environment",
            SubjectKind::Document => "Document",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-metric-class overrides on a subject or on the project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricOptions {
    pub target: Option<f64>,
    pub low_target: Option<f64>,
    pub debt_target: Option<DebtTarget>,
    pub comment: Option<String>,
    /// Source-specific names to leave out of the measurement, e.g. branches.
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// A product, team, environment, document or the project itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    kind: SubjectKind,
    name: String,
    short_name: String,
    url: Option<String>,
    metric_source_ids: HashMap<String, Vec<String>>,
    requirements: Vec<Requirement>,
    metric_options: HashMap<MetricKind, MetricOptions>,
}

impl Subject {
    pub fn new(kind: SubjectKind, name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            short_name: short_name.into(),
            url: None,
            metric_source_ids: HashMap::new(),
            requirements: Vec::new(),
            metric_options: HashMap::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Bind this subject to one or more identifiers at the given metric source.
    pub fn with_source_ids<I, S>(mut self, source_id: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| !id.trim().is_empty())
            .collect();
        self.metric_source_ids.insert(source_id.into(), ids);
        self
    }

    pub fn with_requirements(mut self, requirements: impl IntoIterator<Item = Requirement>) -> Self {
        self.requirements.extend(requirements);
        self
    }

    pub fn with_options(mut self, kind: MetricKind, options: MetricOptions) -> Self {
        self.metric_options.insert(kind, options);
        self
    }

    pub fn kind(&self) -> SubjectKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Identifiers at `source_id`, or `None` when the subject isn't bound to it.
    pub fn metric_source_ids(&self, source_id: &str) -> Option<&[String]> {
        self.metric_source_ids
            .get(source_id)
            .filter(|ids| !ids.is_empty())
            .map(Vec::as_slice)
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Metric classes required by this subject, first occurrence wins.
    pub fn required_metric_kinds(&self) -> Vec<MetricKind> {
        let mut kinds = Vec::new();
        for requirement in &self.requirements {
            for kind in requirement.metric_kinds() {
                if !kinds.contains(kind) {
                    kinds.push(*kind);
                }
            }
        }
        kinds
    }

    pub fn options_for(&self, kind: MetricKind) -> Option<&MetricOptions> {
        self.metric_options.get(&kind)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
