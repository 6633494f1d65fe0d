use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::{GitHubSource, GitSource, JsonReportSource, MetricSource, RetryConfig, SourceRetryHandler};
use crate::domain::{ConfigurationError, SourceDefinition};

/// Runtime settings shared by all metric sources of a project.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub retry: RetryConfig,
    pub github_token: Option<String>,
    pub github_requests_per_second: u32,
    /// Directory that relative repository and report paths resolve against.
    pub base_dir: PathBuf,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            github_token: None,
            github_requests_per_second: 1,
            base_dir: PathBuf::from("."),
        }
    }
}

/// Construct the metric source described by `definition`.
pub fn build_source(
    definition: &SourceDefinition,
    settings: &SourceSettings,
) -> Result<Arc<dyn MetricSource>, ConfigurationError> {
    let name = definition.name.as_deref().unwrap_or(&definition.id);
    debug!(source.id = %definition.id, source.type = %definition.source_type, "Building metric source");

    let source: Arc<dyn MetricSource> = match definition.source_type.as_str() {
        "github" => {
            let token = definition
                .token_env
                .as_ref()
                .and_then(|variable| std::env::var(variable).ok())
                .filter(|token| !token.is_empty())
                .or_else(|| settings.github_token.clone());
            let mut source = GitHubSource::new(&definition.id, name, definition.api_url.as_deref(), token)
                .map_err(|error| ConfigurationError::Source {
                    id: definition.id.clone(),
                    reason: error.to_string(),
                })?
                .with_retry(SourceRetryHandler::new(settings.retry.clone()))
                .with_requests_per_second(settings.github_requests_per_second);
            if let Some(url) = &definition.url {
                source = source.with_url(url);
            }
            Arc::new(source)
        }
        "git" => {
            let mut source = GitSource::new(&definition.id, name, settings.base_dir.clone());
            if let Some(url) = &definition.url {
                source = source.with_url(url);
            }
            Arc::new(source)
        }
        "json_report" => {
            let mut source = JsonReportSource::new(&definition.id, name, settings.base_dir.clone());
            if let Some(url) = &definition.url {
                source = source.with_url(url);
            }
            Arc::new(source)
        }
        other => return Err(ConfigurationError::UnknownSourceType(other.to_string())),
    };
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric_source::Capability;

    fn definition(source_type: &str) -> SourceDefinition {
        SourceDefinition {
            id: "source".to_string(),
            kind: Some("code_quality".to_string()),
            kinds: Vec::new(),
            source_type: source_type.to_string(),
            name: Some("Source".to_string()),
            url: Some("https://reports.example.org".to_string()),
            api_url: None,
            token_env: None,
        }
    }

    #[test]
    fn builds_local_sources() {
        let settings = SourceSettings::default();

        let json = build_source(&definition("json_report"), &settings).unwrap();
        assert_eq!(json.name(), "Source");
        assert!(json.capabilities().contains(&Capability::Percentage));
        assert_eq!(
            json.metric_source_urls(&["a.json".to_string()]),
            vec!["https://reports.example.org/a.json".to_string()]
        );

        let git = build_source(&definition("git"), &settings).unwrap();
        assert!(git.capabilities().contains(&Capability::Count));
    }

    #[tokio::test]
    async fn builds_github_source() {
        let github = build_source(&definition("github"), &SourceSettings::default()).unwrap();
        assert!(github.capabilities().contains(&Capability::Flag));
    }

    #[test]
    fn rejects_unknown_type() {
        let error = build_source(&definition("jenkins"), &SourceSettings::default()).unwrap_err();
        assert!(matches!(error, ConfigurationError::UnknownSourceType(name) if name == "jenkins"));
    }
}
