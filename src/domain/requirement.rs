use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::metric::MetricKind;

/// A quality requirement a subject signs up for; each one pulls in a fixed
/// set of metric classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    TrackCiJobs,
    CodeQuality,
    UnitTests,
    TrackBranches,
    SecurityScan,
    TrackBugs,
    TrackUserStoriesInProgress,
    TrackSecurityTestDate,
}

impl Requirement {
    pub const ALL: [Requirement; 8] = [
        Requirement::TrackCiJobs,
        Requirement::CodeQuality,
        Requirement::UnitTests,
        Requirement::TrackBranches,
        Requirement::SecurityScan,
        Requirement::TrackBugs,
        Requirement::TrackUserStoriesInProgress,
        Requirement::TrackSecurityTestDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Requirement::TrackCiJobs => "track_ci_jobs",
            Requirement::CodeQuality => "code_quality",
            Requirement::UnitTests => "unit_tests",
            Requirement::TrackBranches => "track_branches",
            Requirement::SecurityScan => "security_scan",
            Requirement::TrackBugs => "track_bugs",
            Requirement::TrackUserStoriesInProgress => "track_user_stories_in_progress",
            Requirement::TrackSecurityTestDate => "track_security_test_date",
        }
    }

    /// Metric classes measured for this requirement, in section order.
    pub fn metric_kinds(self) -> &'static [MetricKind] {
        match self {
            Requirement::TrackCiJobs => &[MetricKind::FailingCiJobs, MetricKind::DefaultBranchRed],
            Requirement::CodeQuality => &[
                MetricKind::MajorViolations,
                MetricKind::CriticalViolations,
                MetricKind::TotalLoc,
            ],
            Requirement::UnitTests => &[MetricKind::UnittestLineCoverage, MetricKind::FailingTests],
            Requirement::TrackBranches => &[MetricKind::UnmergedBranches],
            Requirement::SecurityScan => &[MetricKind::HighRiskSecurityWarnings],
            Requirement::TrackBugs => &[MetricKind::OpenBugs],
            Requirement::TrackUserStoriesInProgress => &[MetricKind::UserStoriesInProgress],
            Requirement::TrackSecurityTestDate => &[MetricKind::SecurityTestAge],
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Requirement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::ALL
            .into_iter()
            .find(|requirement| requirement.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}
