use std::collections::HashMap;
use std::sync::Arc;

use super::dashboard::Dashboard;
use super::subject::{Subject, SubjectKind};
use crate::metric_source::{MetricSource, SourceKind};

/// Immutable project definition shared by every metric of a report run.
#[derive(Debug, Clone)]
pub struct Project {
    organization: String,
    subject: Arc<Subject>,
    sources: HashMap<SourceKind, Arc<dyn MetricSource>>,
    products: Vec<Arc<Subject>>,
    teams: Vec<Arc<Subject>>,
    environments: Vec<Arc<Subject>>,
    documents: Vec<Arc<Subject>>,
    dashboard: Option<Dashboard>,
}

impl Project {
    /// `subject` carries the project's own name, identifiers, requirements and
    /// project-wide metric options.
    pub fn new(organization: impl Into<String>, subject: Subject) -> Self {
        Self {
            organization: organization.into(),
            subject: Arc::new(subject),
            sources: HashMap::new(),
            products: Vec::new(),
            teams: Vec::new(),
            environments: Vec::new(),
            documents: Vec::new(),
            dashboard: None,
        }
    }

    pub fn with_source(mut self, kind: SourceKind, source: Arc<dyn MetricSource>) -> Self {
        self.sources.insert(kind, source);
        self
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        let subject = Arc::new(subject);
        match subject.kind() {
            SubjectKind::Product => self.products.push(subject),
            SubjectKind::Team => self.teams.push(subject),
            SubjectKind::Environment => self.environments.push(subject),
            SubjectKind::Document => self.documents.push(subject),
            SubjectKind::Project => {
                tracing::warn!(name = subject.name(), "Ignoring nested project subject");
            }
        }
        self
    }

    pub fn with_dashboard(mut self, dashboard: Dashboard) -> Self {
        self.dashboard = Some(dashboard);
        self
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn name(&self) -> &str {
        self.subject.name()
    }

    pub fn subject(&self) -> &Arc<Subject> {
        &self.subject
    }

    pub fn source_for(&self, kind: SourceKind) -> Option<&Arc<dyn MetricSource>> {
        self.sources.get(&kind)
    }

    pub fn products(&self) -> &[Arc<Subject>] {
        &self.products
    }

    pub fn teams(&self) -> &[Arc<Subject>] {
        &self.teams
    }

    pub fn environments(&self) -> &[Arc<Subject>] {
        &self.environments
    }

    pub fn documents(&self) -> &[Arc<Subject>] {
        &self.documents
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.dashboard.as_ref()
    }

    /// Every subject other than the project itself, in definition order.
    pub fn subjects(&self) -> impl Iterator<Item = &Arc<Subject>> {
        self.products
            .iter()
            .chain(&self.teams)
            .chain(&self.environments)
            .chain(&self.documents)
    }

    /// Find a subject by short name, falling back to its full name.
    pub fn find_subject(&self, key: &str) -> Option<&Arc<Subject>> {
        self.subjects()
            .find(|subject| !subject.short_name().is_empty() && subject.short_name() == key)
            .or_else(|| self.subjects().find(|subject| subject.name() == key))
    }
}
