use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::dashboard::Dashboard;
use super::error::ConfigurationError;
use super::project::Project;
use super::requirement::Requirement;
use super::subject::{MetricOptions, Subject, SubjectKind};
use crate::metric::MetricKind;
use crate::metric_source::{build_source, MetricSource, SourceKind, SourceSettings};

/// Prefix of the project-level section.
pub const PROJECT_SHORT_NAME: &str = "PC";

/// Prefix of the section that gathers all documents.
pub const DOCUMENTS_SHORT_NAME: &str = "DC";

/// Project definition file as written by the user (TOML).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDefinition {
    #[serde(default)]
    pub organization: String,
    pub name: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceDefinition>,
    #[serde(default)]
    pub project_source_ids: HashMap<String, SourceIds>,
    #[serde(default)]
    pub metric_options: HashMap<String, MetricOptions>,
    #[serde(default)]
    pub products: Vec<SubjectDefinition>,
    #[serde(default)]
    pub teams: Vec<SubjectDefinition>,
    #[serde(default)]
    pub environments: Vec<SubjectDefinition>,
    #[serde(default)]
    pub documents: Vec<SubjectDefinition>,
    pub dashboard: Option<Dashboard>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDefinition {
    pub id: String,
    pub kind: Option<String>,
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(rename = "type")]
    pub source_type: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub api_url: Option<String>,
    /// Environment variable holding the access token for this source.
    pub token_env: Option<String>,
}

impl SourceDefinition {
    pub fn source_kinds(&self) -> Result<Vec<SourceKind>, ConfigurationError> {
        let names: Vec<&String> = self.kind.iter().chain(&self.kinds).collect();
        if names.is_empty() {
            return Err(ConfigurationError::MissingSourceKind(self.id.clone()));
        }
        names
            .into_iter()
            .map(|name| {
                name.parse::<SourceKind>()
                    .map_err(|_| ConfigurationError::UnknownSourceKind(name.clone()))
            })
            .collect()
    }
}

/// One identifier or a list of identifiers at a metric source.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceIds {
    One(String),
    Many(Vec<String>),
}

impl SourceIds {
    fn into_vec(self) -> Vec<String> {
        match self {
            SourceIds::One(id) => vec![id],
            SourceIds::Many(ids) => ids,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectDefinition {
    pub name: String,
    pub short_name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub metric_source_ids: HashMap<String, SourceIds>,
    #[serde(default)]
    pub metric_options: HashMap<String, MetricOptions>,
}

impl ProjectDefinition {
    pub fn from_toml(content: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Validate the definition and construct the immutable project.
    pub fn into_project(self, settings: &SourceSettings) -> Result<Project, ConfigurationError> {
        let mut sources_by_id: HashMap<String, Arc<dyn MetricSource>> = HashMap::new();
        let mut kinds: Vec<(SourceKind, String)> = Vec::new();
        for definition in &self.sources {
            if sources_by_id.contains_key(&definition.id) {
                return Err(ConfigurationError::DuplicateSource(definition.id.clone()));
            }
            for kind in definition.source_kinds()? {
                if let Some((_, first)) = kinds.iter().find(|(claimed, _)| *claimed == kind) {
                    return Err(ConfigurationError::DuplicateSourceKind {
                        kind: kind.to_string(),
                        first: first.clone(),
                        second: definition.id.clone(),
                    });
                }
                kinds.push((kind, definition.id.clone()));
            }
            let source = build_source(definition, settings)?;
            debug!(source.id = %definition.id, source.name = source.name(), "Metric source configured");
            sources_by_id.insert(definition.id.clone(), source);
        }

        let project_subject = build_subject(
            SubjectKind::Project,
            SubjectDefinition {
                name: self.name,
                short_name: Some(PROJECT_SHORT_NAME.to_string()),
                url: None,
                requirements: self.requirements,
                metric_source_ids: self.project_source_ids,
                metric_options: self.metric_options,
            },
            &sources_by_id,
        )?;

        let mut project = Project::new(self.organization, project_subject);
        for (kind, source_id) in kinds {
            if let Some(source) = sources_by_id.get(&source_id) {
                project = project.with_source(kind, Arc::clone(source));
            }
        }

        // Section prefixes double as metric id prefixes.
        let mut short_names = HashSet::from([
            PROJECT_SHORT_NAME.to_string(),
            DOCUMENTS_SHORT_NAME.to_string(),
        ]);
        let groups = [
            (SubjectKind::Product, self.products),
            (SubjectKind::Team, self.teams),
            (SubjectKind::Environment, self.environments),
            (SubjectKind::Document, self.documents),
        ];
        for (kind, definitions) in groups {
            for definition in definitions {
                let subject = build_subject(kind, definition, &sources_by_id)?;
                if !subject.short_name().is_empty() && !short_names.insert(subject.short_name().to_string()) {
                    return Err(ConfigurationError::DuplicateShortName(subject.short_name().to_string()));
                }
                project = project.with_subject(subject);
            }
        }

        if let Some(dashboard) = self.dashboard {
            for cell in dashboard.cells() {
                if project.find_subject(&cell.subject).is_none() {
                    return Err(ConfigurationError::UnknownDashboardSubject(cell.subject.clone()));
                }
            }
            project = project.with_dashboard(dashboard);
        }

        info!(
            project = project.name(),
            products = project.products().len(),
            teams = project.teams().len(),
            environments = project.environments().len(),
            documents = project.documents().len(),
            "Project definition loaded"
        );
        Ok(project)
    }
}

fn build_subject(
    kind: SubjectKind,
    definition: SubjectDefinition,
    sources: &HashMap<String, Arc<dyn MetricSource>>,
) -> Result<Subject, ConfigurationError> {
    let short_name = definition.short_name.unwrap_or_default();
    let needs_short_name = !matches!(kind, SubjectKind::Document);
    if (needs_short_name || !short_name.is_empty()) && !is_valid_short_name(&short_name) {
        return Err(ConfigurationError::InvalidShortName {
            subject: definition.name,
            short_name,
        });
    }

    let mut subject = Subject::new(kind, definition.name, short_name);
    if let Some(url) = definition.url {
        subject = subject.with_url(url);
    }

    for (source_id, ids) in definition.metric_source_ids {
        if !sources.contains_key(&source_id) {
            return Err(ConfigurationError::UnknownSource {
                subject: subject.name().to_string(),
                source_id,
            });
        }
        subject = subject.with_source_ids(source_id, ids.into_vec());
    }

    let requirements = definition
        .requirements
        .iter()
        .map(|name| {
            name.parse::<Requirement>()
                .map_err(ConfigurationError::UnknownRequirement)
        })
        .collect::<Result<Vec<_>, _>>()?;
    subject = subject.with_requirements(requirements);

    for (class, options) in definition.metric_options {
        let metric_kind = class
            .parse::<MetricKind>()
            .map_err(ConfigurationError::UnknownMetricClass)?;
        subject = subject.with_options(metric_kind, options);
    }

    Ok(subject)
}

fn is_valid_short_name(short_name: &str) -> bool {
    short_name.chars().count() == 2 && short_name.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Read, validate and construct the project at `path`. Relative report paths
/// in the definition are resolved against the file's directory.
pub fn load_project(path: &Path, settings: &SourceSettings) -> Result<Project, ConfigurationError> {
    let definition = ProjectDefinition::load(path)?;
    let mut settings = settings.clone();
    if let Some(parent) = path.parent() {
        settings.base_dir = parent.to_path_buf();
    }
    definition.into_project(&settings)
}
