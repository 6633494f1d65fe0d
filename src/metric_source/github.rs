use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{
    ensure_capability, Capability, FactRequest, FactValue, MetricSource, SourceError,
    SourceRetryHandler,
};

const CAPABILITIES: &[Capability] = &[Capability::Count, Capability::Flag];

/// GitHub as CI server (Actions workflow runs) and issue tracker.
///
/// Identifiers are `owner/repo` names. Facts:
/// - `failing_jobs`: workflows whose latest run failed
/// - `default_branch_red`: whether any workflow failed on the default branch
/// - `open_issues` or `open_issues:<label>`: number of open issues
#[derive(Debug)]
pub struct GitHubSource {
    id: String,
    name: String,
    url: String,
    octocrab: Octocrab,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    retry: SourceRetryHandler,
}

#[derive(Debug, Deserialize)]
struct WorkflowRuns {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    name: Option<String>,
    workflow_id: u64,
    conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    total_count: u64,
}

#[derive(Debug, Serialize)]
struct RunsQuery<'a> {
    per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SearchQuery {
    q: String,
    per_page: u32,
}

impl GitHubSource {
    pub fn new(
        id: &str,
        name: &str,
        api_url: Option<&str>,
        token: Option<String>,
    ) -> Result<Self, SourceError> {
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        if let Some(api_url) = api_url {
            builder = builder.base_uri(api_url)?;
        }
        let octocrab = builder.build()?;

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            url: "https://github.com".to_string(),
            octocrab,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(NonZeroU32::MIN))),
            retry: SourceRetryHandler::default(),
        })
    }

    /// Web address used for drill-down urls.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: SourceRetryHandler) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_requests_per_second(mut self, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        self.rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(rate)));
        self
    }

    async fn get<R, P>(&self, route: &str, params: Option<&P>) -> Result<R, SourceError>
    where
        R: DeserializeOwned,
        P: Serialize + Sync,
    {
        self.retry
            .execute(route, || async {
                self.rate_limiter
                    .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                    .await;
                debug!(source = %self.id, route, "GitHub API request");
                Ok(self.octocrab.get::<R, _, P>(route, params).await?)
            })
            .await
    }

    /// Latest run of every workflow, newest first as returned by the API.
    async fn latest_runs(
        &self,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<Vec<WorkflowRun>, SourceError> {
        let runs: WorkflowRuns = self
            .get(
                &format!("/repos/{repo}/actions/runs"),
                Some(&RunsQuery {
                    per_page: 100,
                    branch,
                }),
            )
            .await?;
        let mut seen = HashSet::new();
        Ok(runs
            .workflow_runs
            .into_iter()
            .filter(|run| seen.insert(run.workflow_id))
            .collect())
    }

    async fn failing_jobs(&self, repo: &str, exclude: &[String]) -> Result<f64, SourceError> {
        let failing = self
            .latest_runs(repo, None)
            .await?
            .iter()
            .filter(|run| run.conclusion.as_deref() == Some("failure"))
            .filter(|run| {
                run.name
                    .as_ref()
                    .is_none_or(|name| !exclude.contains(name))
            })
            .count();
        Ok(failing as f64)
    }

    async fn default_branch_red(&self, repo: &str) -> Result<bool, SourceError> {
        let repository: Repository = self.get(&format!("/repos/{repo}"), None::<&()>).await?;
        let runs = self
            .latest_runs(repo, Some(&repository.default_branch))
            .await?;
        Ok(runs
            .iter()
            .any(|run| run.conclusion.as_deref() == Some("failure")))
    }

    async fn open_issues(&self, repo: &str, label: Option<&str>) -> Result<f64, SourceError> {
        let mut q = format!("repo:{repo} is:issue is:open");
        if let Some(label) = label {
            q.push_str(&format!(" label:\"{label}\""));
        }
        let result: SearchResult = self
            .get("/search/issues", Some(&SearchQuery { q, per_page: 1 }))
            .await?;
        Ok(result.total_count as f64)
    }
}

#[async_trait]
impl MetricSource for GitHubSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    fn metric_source_urls(&self, ids: &[String]) -> Vec<String> {
        ids.iter().map(|id| format!("{}/{id}", self.url)).collect()
    }

    async fn fact(&self, request: &FactRequest, ids: &[String]) -> Result<FactValue, SourceError> {
        ensure_capability(self, request)?;
        if ids.is_empty() {
            return Err(SourceError::MissingIdentifier);
        }

        let (fact, label) = match request.fact.split_once(':') {
            Some((fact, label)) => (fact, Some(label)),
            None => (request.fact.as_str(), None),
        };

        match (request.capability, fact) {
            (Capability::Count, "failing_jobs") => {
                let mut total = 0.0;
                for repo in ids {
                    total += self.failing_jobs(repo, &request.exclude).await?;
                }
                Ok(FactValue::Number(total))
            }
            (Capability::Count, "open_issues") => {
                let mut total = 0.0;
                for repo in ids {
                    total += self.open_issues(repo, label).await?;
                }
                Ok(FactValue::Number(total))
            }
            (Capability::Flag, "default_branch_red") => {
                for repo in ids {
                    if self.default_branch_red(repo).await? {
                        return Ok(FactValue::Flag(true));
                    }
                }
                Ok(FactValue::Flag(false))
            }
            _ => Err(SourceError::UnknownFact(request.fact.clone())),
        }
    }
}
