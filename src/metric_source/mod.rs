//! Metric sources: the external systems metrics are measured from.
//!
//! Every concrete source implements [`MetricSource`] and declares which
//! [`Capability`] (fact categories) it provides. Metrics pick a source by the
//! [`SourceKind`] the project bound it to and by the capability they need,
//! never by concrete type. Source calls go through the per-run
//! [`QueryCache`], which turns every failure into an unknown reading.

pub mod cache;
pub mod errors;
pub mod factory;
pub mod git;
pub mod github;
pub mod json_report;
pub mod retry;

#[cfg(any(test, feature = "testing"))]
pub mod fake;

pub use cache::QueryCache;
pub use errors::SourceError;
pub use factory::{build_source, SourceSettings};
pub use git::GitSource;
pub use github::GitHubSource;
pub use json_report::JsonReportSource;
pub use retry::{RetryConfig, SourceRetryHandler};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a metric source plays for the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    CiServer,
    VersionControlSystem,
    CodeQuality,
    IssueTracker,
    TestReport,
    SecurityScan,
    ReportDate,
}

impl SourceKind {
    pub const ALL: [SourceKind; 7] = [
        SourceKind::CiServer,
        SourceKind::VersionControlSystem,
        SourceKind::CodeQuality,
        SourceKind::IssueTracker,
        SourceKind::TestReport,
        SourceKind::SecurityScan,
        SourceKind::ReportDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::CiServer => "ci_server",
            SourceKind::VersionControlSystem => "version_control_system",
            SourceKind::CodeQuality => "code_quality",
            SourceKind::IssueTracker => "issue_tracker",
            SourceKind::TestReport => "test_report",
            SourceKind::SecurityScan => "security_scan",
            SourceKind::ReportDate => "report_date",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Category of fact a source can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Count,
    Percentage,
    /// Boolean "is red / is down" state.
    Flag,
    Date,
}

/// What a metric asks of its source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactRequest {
    pub capability: Capability,
    /// Source-specific fact name, e.g. `failing_jobs` or `alerts.high`.
    pub fact: String,
    /// Names the source should leave out, e.g. branches to ignore.
    pub exclude: Vec<String>,
}

impl FactRequest {
    pub fn new(capability: Capability, fact: impl Into<String>) -> Self {
        Self {
            capability,
            fact: fact.into(),
            exclude: Vec::new(),
        }
    }

    pub fn excluding(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FactValue {
    Number(f64),
    Flag(bool),
    Date(DateTime<Utc>),
}

/// Uniform interface over external data providers.
///
/// Implementations own their retry and timeout policy and must always
/// resolve. Errors returned from [`MetricSource::fact`] are turned into an
/// unknown reading by the [`QueryCache`]; they never reach a metric.
#[async_trait]
pub trait MetricSource: Send + Sync + fmt::Debug {
    /// Identifier of this source in the project definition.
    fn id(&self) -> &str;

    /// Human readable name, used as the key of drill-down urls.
    fn name(&self) -> &str;

    fn capabilities(&self) -> &[Capability];

    /// Drill-down urls for the given identifiers.
    fn metric_source_urls(&self, ids: &[String]) -> Vec<String>;

    async fn fact(&self, request: &FactRequest, ids: &[String]) -> Result<FactValue, SourceError>;
}

/// Whether `source` declares `capability`.
pub fn provides(source: &dyn MetricSource, capability: Capability) -> bool {
    source.capabilities().contains(&capability)
}

/// Reject requests for capabilities a source does not declare.
pub(crate) fn ensure_capability(
    source: &dyn MetricSource,
    request: &FactRequest,
) -> Result<(), SourceError> {
    if provides(source, request.capability) {
        Ok(())
    } else {
        Err(SourceError::Unsupported {
            source_name: source.name().to_string(),
            capability: request.capability,
        })
    }
}
