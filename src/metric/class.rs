use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::status::Direction;
use crate::domain::ValueGranularity;
use crate::metric_source::{Capability, SourceKind};

/// Identifier of a metric class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    FailingCiJobs,
    DefaultBranchRed,
    MajorViolations,
    CriticalViolations,
    TotalLoc,
    UnittestLineCoverage,
    FailingTests,
    HighRiskSecurityWarnings,
    UnmergedBranches,
    OpenBugs,
    UserStoriesInProgress,
    SecurityTestAge,
}

impl MetricKind {
    pub const ALL: [MetricKind; 12] = [
        MetricKind::FailingCiJobs,
        MetricKind::DefaultBranchRed,
        MetricKind::MajorViolations,
        MetricKind::CriticalViolations,
        MetricKind::TotalLoc,
        MetricKind::UnittestLineCoverage,
        MetricKind::FailingTests,
        MetricKind::HighRiskSecurityWarnings,
        MetricKind::UnmergedBranches,
        MetricKind::OpenBugs,
        MetricKind::UserStoriesInProgress,
        MetricKind::SecurityTestAge,
    ];

    pub fn as_str(self) -> &'static str {
        self.class().id
    }

    pub fn class(self) -> &'static MetricClass {
        &CLASSES[self as usize]
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Static description of a metric class: where its value comes from, which
/// way is better and the default norm.
#[derive(Debug)]
pub struct MetricClass {
    pub kind: MetricKind,
    pub id: &'static str,
    pub name: &'static str,
    pub source_kind: SourceKind,
    pub capability: Capability,
    pub fact: &'static str,
    pub direction: Direction,
    pub target: f64,
    pub low_target: f64,
    pub perfect_value: f64,
    pub unit: &'static str,
    pub granularity: ValueGranularity,
    /// Report text; placeholders `{name}`, `{value}`, `{target}`,
    /// `{low_target}` and `{unit}`.
    pub template: &'static str,
    pub norm_template: &'static str,
}

const LOWER_NORM: &str =
    "At most {target} {unit}. More than {low_target} {unit} is red.";

/// Indexed by `MetricKind as usize`.
pub static CLASSES: [MetricClass; 12] = [
    MetricClass {
        kind: MetricKind::FailingCiJobs,
        id: "failing_ci_jobs",
        name: "Failing CI jobs",
        source_kind: SourceKind::CiServer,
        capability: Capability::Count,
        fact: "failing_jobs",
        direction: Direction::LowerIsBetter,
        target: 0.0,
        low_target: 2.0,
        perfect_value: 0.0,
        unit: "failing CI jobs",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} {unit}.",
        norm_template: LOWER_NORM,
    },
    MetricClass {
        kind: MetricKind::DefaultBranchRed,
        id: "default_branch_red",
        name: "Default branch build",
        source_kind: SourceKind::CiServer,
        capability: Capability::Flag,
        fact: "default_branch_red",
        direction: Direction::LowerIsBetter,
        target: 0.0,
        low_target: 0.0,
        perfect_value: 0.0,
        unit: "red builds",
        granularity: ValueGranularity::Integer,
        template: "The default branch of {name} has {value} {unit}.",
        norm_template: "The default branch builds successfully.",
    },
    MetricClass {
        kind: MetricKind::MajorViolations,
        id: "major_violations",
        name: "Major violations",
        source_kind: SourceKind::CodeQuality,
        capability: Capability::Count,
        fact: "major_violations",
        direction: Direction::LowerIsBetter,
        target: 25.0,
        low_target: 50.0,
        perfect_value: 0.0,
        unit: "major violations",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} {unit}.",
        norm_template: LOWER_NORM,
    },
    MetricClass {
        kind: MetricKind::CriticalViolations,
        id: "critical_violations",
        name: "Critical violations",
        source_kind: SourceKind::CodeQuality,
        capability: Capability::Count,
        fact: "critical_violations",
        direction: Direction::LowerIsBetter,
        target: 0.0,
        low_target: 1.0,
        perfect_value: 0.0,
        unit: "critical violations",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} {unit}.",
        norm_template: LOWER_NORM,
    },
    MetricClass {
        kind: MetricKind::TotalLoc,
        id: "total_loc",
        name: "Size",
        source_kind: SourceKind::CodeQuality,
        capability: Capability::Count,
        fact: "ncloc",
        direction: Direction::LowerIsBetter,
        target: 160_000.0,
        low_target: 200_000.0,
        perfect_value: 0.0,
        unit: "LOC",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} {unit}.",
        norm_template: "Size is at most {target} {unit}. More than {low_target} {unit} is red.",
    },
    MetricClass {
        kind: MetricKind::UnittestLineCoverage,
        id: "unittest_line_coverage",
        name: "Unit test line coverage",
        source_kind: SourceKind::CodeQuality,
        capability: Capability::Percentage,
        fact: "line_coverage",
        direction: Direction::HigherIsBetter,
        target: 98.0,
        low_target: 90.0,
        perfect_value: 100.0,
        unit: "%",
        granularity: ValueGranularity::Percentage,
        template: "{name} unit test line coverage is {value}{unit}.",
        norm_template: "Line coverage is at least {target}{unit}. Less than {low_target}{unit} is red.",
    },
    MetricClass {
        kind: MetricKind::FailingTests,
        id: "failing_tests",
        name: "Failing unit tests",
        source_kind: SourceKind::TestReport,
        capability: Capability::Count,
        fact: "failed",
        direction: Direction::LowerIsBetter,
        target: 0.0,
        low_target: 0.0,
        perfect_value: 0.0,
        unit: "failing tests",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} {unit}.",
        norm_template: "All tests pass.",
    },
    MetricClass {
        kind: MetricKind::HighRiskSecurityWarnings,
        id: "high_risk_security_warnings",
        name: "High risk security warnings",
        source_kind: SourceKind::SecurityScan,
        capability: Capability::Count,
        fact: "alerts.high",
        direction: Direction::LowerIsBetter,
        target: 0.0,
        low_target: 0.0,
        perfect_value: 0.0,
        unit: "high risk security warnings",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} {unit}.",
        norm_template: "No {unit}.",
    },
    MetricClass {
        kind: MetricKind::UnmergedBranches,
        id: "unmerged_branches",
        name: "Unmerged branches",
        source_kind: SourceKind::VersionControlSystem,
        capability: Capability::Count,
        fact: "unmerged_branches",
        direction: Direction::LowerIsBetter,
        target: 0.0,
        low_target: 1.0,
        perfect_value: 0.0,
        unit: "unmerged branches",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} branches that are not merged into the default branch.",
        norm_template: LOWER_NORM,
    },
    MetricClass {
        kind: MetricKind::OpenBugs,
        id: "open_bugs",
        name: "Open bugs",
        source_kind: SourceKind::IssueTracker,
        capability: Capability::Count,
        fact: "open_issues:bug",
        direction: Direction::LowerIsBetter,
        target: 50.0,
        low_target: 100.0,
        perfect_value: 0.0,
        unit: "open bugs",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} {unit}.",
        norm_template: LOWER_NORM,
    },
    MetricClass {
        kind: MetricKind::UserStoriesInProgress,
        id: "user_stories_in_progress",
        name: "User stories in progress",
        source_kind: SourceKind::IssueTracker,
        capability: Capability::Count,
        fact: "open_issues:in progress",
        direction: Direction::LowerIsBetter,
        target: 3.0,
        low_target: 5.0,
        perfect_value: 0.0,
        unit: "user stories in progress",
        granularity: ValueGranularity::Integer,
        template: "{name} has {value} {unit}.",
        norm_template: LOWER_NORM,
    },
    MetricClass {
        kind: MetricKind::SecurityTestAge,
        id: "security_test_age",
        name: "Security test age",
        source_kind: SourceKind::ReportDate,
        capability: Capability::Date,
        fact: "date",
        direction: Direction::LowerIsBetter,
        target: 180.0,
        low_target: 270.0,
        perfect_value: 0.0,
        unit: "days",
        granularity: ValueGranularity::Duration,
        template: "The last security test of {name} was {value} {unit} ago.",
        norm_template: "A security test is done at least every {target} {unit}. More than {low_target} {unit} ago is red.",
    },
];
