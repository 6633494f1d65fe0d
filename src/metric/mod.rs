//! Metrics: one measured quantity of one subject, classified against its
//! norm.
//!
//! A [`Metric`] is bound to a subject and the project at construction. Its
//! value is fetched at most once per run through the run's query cache and
//! every failure along the way degrades to [`Status::Grey`].

pub mod class;
pub mod context;
pub mod status;

pub use class::{MetricClass, MetricKind, CLASSES};
pub use context::RunContext;
pub use status::{Direction, Status, Trend};

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::domain::{DebtTarget, MetricOptions, Project, Subject, ValueGranularity};
use crate::history::History;
use crate::metric_source::{provides, FactRequest, FactValue, MetricSource};

/// Number of past values shown in a metric's sparkline.
pub const SPARKLINE_LENGTH: usize = 12;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").ok());

/// Why a metric has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmeasurableReason {
    NoSource,
    SourceLacksCapability,
    MissingIdentifier,
    SourceUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    Value(f64),
    Unmeasurable(UnmeasurableReason),
}

impl Measurement {
    pub fn value(&self) -> Option<f64> {
        match self {
            Measurement::Value(value) => Some(*value),
            Measurement::Unmeasurable(_) => None,
        }
    }
}

/// Norm a value is classified against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub direction: Direction,
    pub target: f64,
    pub low_target: f64,
    pub perfect_value: f64,
    /// Accepted value when technical debt is configured.
    pub debt_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: Status,
    /// The norm is only met thanks to accepted technical debt.
    pub technical_debt: bool,
}

/// Classify a value by counting the thresholds it is worse than.
///
/// The effective target is the debt value when debt is configured and the
/// value misses the ideal target. No breach is green (perfect when the value
/// equals the perfect value), one breach yellow, two red. Unknown is grey.
pub fn classify(value: Option<f64>, thresholds: &Thresholds) -> Classification {
    let Some(value) = value else {
        return Classification {
            status: Status::Grey,
            technical_debt: false,
        };
    };
    let direction = thresholds.direction;
    let misses_target = direction.is_worse(value, thresholds.target);
    let (effective_target, technical_debt) = match thresholds.debt_value {
        Some(debt) if misses_target => (debt, !direction.is_worse(value, debt)),
        _ => (thresholds.target, false),
    };

    let breaches = [effective_target, thresholds.low_target]
        .into_iter()
        .filter(|threshold| direction.is_worse(value, *threshold))
        .count();
    let status = match breaches {
        0 if value == thresholds.perfect_value => Status::Perfect,
        0 => Status::Green,
        1 => Status::Yellow,
        _ => Status::Red,
    };
    Classification {
        status,
        technical_debt,
    }
}

/// Outcome of evaluating one metric in one run.
#[derive(Debug, Clone, Serialize)]
pub struct MetricResult {
    pub id: String,
    pub class: MetricKind,
    pub name: String,
    pub subject: String,
    pub value: Option<f64>,
    pub unit: String,
    pub status: Status,
    pub status_start_date: DateTime<Utc>,
    pub trend: Trend,
    pub technical_debt: bool,
    pub report: String,
    pub norm: String,
    pub comment: Option<String>,
    pub urls: BTreeMap<String, Vec<String>>,
    /// Recent values, oldest first, ending with this run.
    pub sparkline: Vec<Option<f64>>,
}

#[derive(Debug)]
pub struct Metric {
    id: String,
    kind: MetricKind,
    subject: Arc<Subject>,
    project: Arc<Project>,
    measurement: OnceCell<Measurement>,
}

impl Metric {
    pub fn new(kind: MetricKind, subject: Arc<Subject>, project: Arc<Project>) -> Self {
        Self {
            id: String::new(),
            kind,
            subject,
            project,
            measurement: OnceCell::new(),
        }
    }

    /// Assigned by the section that owns the metric.
    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn class(&self) -> &'static MetricClass {
        self.kind.class()
    }

    pub fn subject(&self) -> &Arc<Subject> {
        &self.subject
    }

    /// Options for this class, subject overrides before project overrides.
    fn options(&self) -> impl Iterator<Item = &MetricOptions> {
        [
            self.subject.options_for(self.kind),
            self.project.subject().options_for(self.kind),
        ]
        .into_iter()
        .flatten()
    }

    pub fn target(&self) -> f64 {
        self.options()
            .find_map(|options| options.target)
            .unwrap_or(self.class().target)
    }

    pub fn low_target(&self) -> f64 {
        self.options()
            .find_map(|options| options.low_target)
            .unwrap_or(self.class().low_target)
    }

    pub fn debt_target(&self) -> Option<&DebtTarget> {
        self.options().find_map(|options| options.debt_target.as_ref())
    }

    pub fn comment(&self) -> Option<&str> {
        self.options().find_map(|options| options.comment.as_deref())
    }

    fn ignored(&self) -> Vec<String> {
        self.options()
            .find(|options| !options.ignore.is_empty())
            .map(|options| options.ignore.clone())
            .unwrap_or_default()
    }

    pub fn source(&self) -> Option<&Arc<dyn MetricSource>> {
        self.project.source_for(self.class().source_kind)
    }

    pub fn thresholds(&self, at: DateTime<Utc>) -> Thresholds {
        let class = self.class();
        Thresholds {
            direction: class.direction,
            target: self.target(),
            low_target: self.low_target(),
            perfect_value: class.perfect_value,
            debt_value: self
                .debt_target()
                .map(|debt| debt.accepted_value(at, class.granularity)),
        }
    }

    /// Fetch the value once; later calls in the run reuse it.
    pub async fn measure(&self, ctx: &RunContext) -> Measurement {
        *self.measurement.get_or_init(|| self.fetch(ctx)).await
    }

    async fn fetch(&self, ctx: &RunContext) -> Measurement {
        let class = self.class();
        let Some(source) = self.source() else {
            debug!(metric = %self.id, kind = %class.source_kind, "No metric source configured");
            return Measurement::Unmeasurable(UnmeasurableReason::NoSource);
        };
        if !provides(source.as_ref(), class.capability) {
            return Measurement::Unmeasurable(UnmeasurableReason::SourceLacksCapability);
        }
        let Some(ids) = self.subject.metric_source_ids(source.id()) else {
            debug!(metric = %self.id, source = source.id(), "Subject has no identifier at source");
            return Measurement::Unmeasurable(UnmeasurableReason::MissingIdentifier);
        };

        let request = FactRequest::new(class.capability, class.fact).excluding(self.ignored());
        match ctx.cache().fact(source, &request, ids).await {
            None => Measurement::Unmeasurable(UnmeasurableReason::SourceUnavailable),
            Some(FactValue::Number(value)) => Measurement::Value(value),
            Some(FactValue::Flag(red)) => Measurement::Value(if red { 1.0 } else { 0.0 }),
            Some(FactValue::Date(date)) => {
                Measurement::Value((ctx.now() - date).num_days().max(0) as f64)
            }
        }
    }

    pub async fn value(&self, ctx: &RunContext) -> Option<f64> {
        self.measure(ctx).await.value()
    }

    pub async fn classification(&self, ctx: &RunContext) -> Classification {
        let value = self.value(ctx).await;
        classify(value, &self.thresholds(ctx.now()))
    }

    pub async fn status(&self, ctx: &RunContext) -> Status {
        self.classification(ctx).await.status
    }

    pub async fn report(&self, ctx: &RunContext) -> String {
        let measurement = self.measure(ctx).await;
        let classification = self.classification(ctx).await;
        self.report_text(measurement, classification)
    }

    fn report_text(&self, measurement: Measurement, classification: Classification) -> String {
        let class = self.class();
        let mut text = match measurement {
            Measurement::Value(value) => self.fill(class.template, Some(value)),
            Measurement::Unmeasurable(reason) => format!(
                "{} of {} can't be measured because {}.",
                class.name,
                self.subject.name(),
                self.describe(reason)
            ),
        };
        if classification.technical_debt {
            match self.debt_target().map(DebtTarget::explanation) {
                Some(explanation) if !explanation.is_empty() => {
                    text.push_str(&format!(" Accepted technical debt: {explanation}."));
                }
                _ => text.push_str(" Technical debt is accepted."),
            }
        }
        if let Some(comment) = self.comment() {
            text.push(' ');
            text.push_str(comment);
        }
        text
    }

    fn describe(&self, reason: UnmeasurableReason) -> String {
        let kind = self.class().source_kind;
        match reason {
            UnmeasurableReason::NoSource => format!("no {kind} source is configured"),
            UnmeasurableReason::SourceLacksCapability => {
                format!("the {kind} source doesn't provide this information")
            }
            UnmeasurableReason::MissingIdentifier => {
                format!("no identifier at the {kind} source is configured")
            }
            UnmeasurableReason::SourceUnavailable => format!("the {kind} source could not be read"),
        }
    }

    /// Norm text for the current thresholds.
    pub fn norm(&self) -> String {
        self.fill(self.class().norm_template, None)
    }

    fn fill(&self, template: &str, value: Option<f64>) -> String {
        let class = self.class();
        let Some(placeholder) = PLACEHOLDER.as_ref() else {
            return template.to_string();
        };
        placeholder
            .replace_all(template, |captures: &Captures| match &captures[1] {
                "name" => self.subject.name().to_string(),
                "value" => value
                    .map(|value| format_value(value, class.granularity))
                    .unwrap_or_else(|| "?".to_string()),
                "target" => format_value(self.target(), class.granularity),
                "low_target" => format_value(self.low_target(), class.granularity),
                "unit" => class.unit.to_string(),
                _ => captures[0].to_string(),
            })
            .into_owned()
    }

    /// Drill-down urls keyed by source name.
    pub fn urls(&self) -> BTreeMap<String, Vec<String>> {
        let mut urls = BTreeMap::new();
        if let Some(source) = self.source() {
            if let Some(ids) = self.subject.metric_source_ids(source.id()) {
                urls.insert(source.name().to_string(), source.metric_source_urls(ids));
            }
        }
        urls
    }

    /// Measure, classify and relate to history.
    pub async fn evaluate(&self, ctx: &RunContext, history: &History) -> MetricResult {
        let measurement = self.measure(ctx).await;
        let value = measurement.value();
        let classification = classify(value, &self.thresholds(ctx.now()));
        let class = self.class();

        let mut sparkline: Vec<Option<f64>> = history
            .value_series(&self.id)
            .map(|(_, value)| value)
            .collect();
        sparkline.push(value);
        let skip = sparkline.len().saturating_sub(SPARKLINE_LENGTH);
        sparkline.drain(..skip);

        MetricResult {
            id: self.id.clone(),
            class: self.kind,
            name: class.name.to_string(),
            subject: self.subject.name().to_string(),
            value: value.map(|value| class.granularity.round(value)),
            unit: class.unit.to_string(),
            status: classification.status,
            status_start_date: history.status_start_date(&self.id, classification.status, ctx.now()),
            trend: history.trend(&self.id, value, class.direction),
            technical_debt: classification.technical_debt,
            report: self.report_text(measurement, classification),
            norm: self.norm(),
            comment: self.comment().map(str::to_string),
            urls: self.urls(),
            sparkline,
        }
    }
}

fn format_value(value: f64, granularity: ValueGranularity) -> String {
    let rounded = granularity.round(value);
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SubjectKind, TechnicalDebtTarget};
    use crate::metric_source::fake::FakeSource;
    use crate::metric_source::{Capability, SourceKind};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn lower(target: f64, low_target: f64) -> Thresholds {
        Thresholds {
            direction: Direction::LowerIsBetter,
            target,
            low_target,
            perfect_value: 0.0,
            debt_value: None,
        }
    }

    fn setup(source: FakeSource, kind: SourceKind, options: Option<(MetricKind, MetricOptions)>) -> (Arc<Subject>, Arc<Project>) {
        let mut subject = Subject::new(SubjectKind::Product, "Product", "PR")
            .with_source_ids(source.id().to_string(), ["product"]);
        if let Some((metric_kind, options)) = options {
            subject = subject.with_options(metric_kind, options);
        }
        let subject = Arc::new(subject);
        let project = Project::new("Org", Subject::new(SubjectKind::Project, "Project", "PC"))
            .with_source(kind, Arc::new(source));
        (subject, Arc::new(project))
    }

    #[test]
    fn classifies_by_breached_thresholds() {
        assert_eq!(classify(Some(47.0), &lower(50.0, 80.0)).status, Status::Green);
        assert_eq!(classify(Some(47.0), &lower(50.0, 40.0)).status, Status::Yellow);
        assert_eq!(classify(Some(60.0), &lower(50.0, 80.0)).status, Status::Yellow);
        assert_eq!(classify(Some(90.0), &lower(50.0, 80.0)).status, Status::Red);
        assert_eq!(classify(Some(0.0), &lower(50.0, 80.0)).status, Status::Perfect);
        assert_eq!(classify(None, &lower(50.0, 80.0)).status, Status::Grey);
    }

    #[test]
    fn higher_is_better_classification() {
        let coverage = Thresholds {
            direction: Direction::HigherIsBetter,
            target: 98.0,
            low_target: 90.0,
            perfect_value: 100.0,
            debt_value: None,
        };
        assert_eq!(classify(Some(100.0), &coverage).status, Status::Perfect);
        assert_eq!(classify(Some(99.0), &coverage).status, Status::Green);
        assert_eq!(classify(Some(95.0), &coverage).status, Status::Yellow);
        assert_eq!(classify(Some(80.0), &coverage).status, Status::Red);
    }

    #[test]
    fn debt_target_replaces_missed_target() {
        let thresholds = Thresholds {
            debt_value: Some(47.0),
            ..lower(25.0, 50.0)
        };
        let classification = classify(Some(47.0), &thresholds);
        assert_eq!(classification.status, Status::Green);
        assert!(classification.technical_debt);

        let beyond_debt = classify(Some(48.0), &thresholds);
        assert_eq!(beyond_debt.status, Status::Yellow);
        assert!(!beyond_debt.technical_debt);

        let meets_target = classify(Some(20.0), &thresholds);
        assert_eq!(meets_target.status, Status::Green);
        assert!(!meets_target.technical_debt);
    }

    #[tokio::test]
    async fn measures_and_reports() {
        let source = FakeSource::new("sonar").with_name("SonarQube").with_number("major_violations", 47.0);
        let (subject, project) = setup(source, SourceKind::CodeQuality, None);
        let mut metric = Metric::new(MetricKind::MajorViolations, subject, project);
        metric.set_id("PR-1".into());
        let ctx = RunContext::new(now());

        assert_eq!(metric.value(&ctx).await, Some(47.0));
        assert_eq!(metric.status(&ctx).await, Status::Yellow);
        assert_eq!(metric.report(&ctx).await, "Product has 47 major violations.");
        assert_eq!(
            metric.norm(),
            "At most 25 major violations. More than 50 major violations is red."
        );
        assert_eq!(
            metric.urls().get("SonarQube"),
            Some(&vec!["https://sonar.example.org/product".to_string()])
        );
    }

    #[tokio::test]
    async fn value_is_fetched_once() {
        let source = Arc::new(FakeSource::new("sonar").with_number("ncloc", 1000.0));
        let subject = Arc::new(
            Subject::new(SubjectKind::Product, "Product", "PR").with_source_ids("sonar", ["p"]),
        );
        let project = Arc::new(
            Project::new("Org", Subject::new(SubjectKind::Project, "Project", "PC"))
                .with_source(SourceKind::CodeQuality, source.clone()),
        );
        let metric = Metric::new(MetricKind::TotalLoc, subject, project);
        let ctx = RunContext::new(now());

        metric.value(&ctx).await;
        metric.status(&ctx).await;
        metric.report(&ctx).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn missing_data_is_grey() {
        let ctx = RunContext::new(now());

        // No source of the needed kind.
        let (subject, project) = setup(FakeSource::new("git"), SourceKind::VersionControlSystem, None);
        let metric = Metric::new(MetricKind::OpenBugs, subject, project);
        assert_eq!(metric.measure(&ctx).await, Measurement::Unmeasurable(UnmeasurableReason::NoSource));
        assert_eq!(metric.status(&ctx).await, Status::Grey);
        assert!(metric.report(&ctx).await.contains("can't be measured"));

        // Source lacks the capability.
        let source = FakeSource::new("tracker").with_capabilities(&[Capability::Flag]);
        let (subject, project) = setup(source, SourceKind::IssueTracker, None);
        let metric = Metric::new(MetricKind::OpenBugs, subject, project);
        assert_eq!(
            metric.measure(&ctx).await,
            Measurement::Unmeasurable(UnmeasurableReason::SourceLacksCapability)
        );

        // Subject has no identifier at the source.
        let subject = Arc::new(Subject::new(SubjectKind::Product, "Product", "PR"));
        let project = Arc::new(
            Project::new("Org", Subject::new(SubjectKind::Project, "Project", "PC"))
                .with_source(SourceKind::IssueTracker, Arc::new(FakeSource::new("tracker"))),
        );
        let metric = Metric::new(MetricKind::OpenBugs, subject, project);
        assert_eq!(
            metric.measure(&ctx).await,
            Measurement::Unmeasurable(UnmeasurableReason::MissingIdentifier)
        );

        // Source fails.
        let (subject, project) = setup(FakeSource::new("tracker").failing(), SourceKind::IssueTracker, None);
        let metric = Metric::new(MetricKind::OpenBugs, subject, project);
        assert_eq!(
            metric.measure(&ctx).await,
            Measurement::Unmeasurable(UnmeasurableReason::SourceUnavailable)
        );
        assert_eq!(metric.status(&ctx).await, Status::Grey);
    }

    #[tokio::test]
    async fn subject_options_override_class_defaults() {
        let options = MetricOptions {
            target: Some(50.0),
            low_target: Some(80.0),
            comment: Some("Agreed with the product owner.".into()),
            ..MetricOptions::default()
        };
        let source = FakeSource::new("sonar").with_number("major_violations", 47.0);
        let (subject, project) = setup(source, SourceKind::CodeQuality, Some((MetricKind::MajorViolations, options)));
        let metric = Metric::new(MetricKind::MajorViolations, subject, project);
        let ctx = RunContext::new(now());

        assert_eq!(metric.status(&ctx).await, Status::Green);
        assert!(metric.report(&ctx).await.ends_with("Agreed with the product owner."));
    }

    #[tokio::test]
    async fn debt_target_is_reported() {
        let options = MetricOptions {
            debt_target: Some(TechnicalDebtTarget::new(50.0, "Legacy code").into()),
            ..MetricOptions::default()
        };
        let source = FakeSource::new("sonar").with_number("major_violations", 47.0);
        let (subject, project) = setup(source, SourceKind::CodeQuality, Some((MetricKind::MajorViolations, options)));
        let metric = Metric::new(MetricKind::MajorViolations, subject, project);
        let ctx = RunContext::new(now());

        let classification = metric.classification(&ctx).await;
        assert_eq!(classification.status, Status::Green);
        assert!(classification.technical_debt);
        assert!(metric.report(&ctx).await.contains("Accepted technical debt: Legacy code."));
    }

    #[tokio::test]
    async fn dates_become_days_since() {
        let source = FakeSource::new("reports")
            .with_date("date", now() - chrono::Duration::days(200));
        let (subject, project) = setup(source, SourceKind::ReportDate, None);
        let metric = Metric::new(MetricKind::SecurityTestAge, subject, project);
        let ctx = RunContext::new(now());

        assert_eq!(metric.value(&ctx).await, Some(200.0));
        assert_eq!(metric.status(&ctx).await, Status::Yellow);
    }

    #[tokio::test]
    async fn red_flag_is_one() {
        let source = FakeSource::new("ci").with_flag("default_branch_red", true);
        let (subject, project) = setup(source, SourceKind::CiServer, None);
        let metric = Metric::new(MetricKind::DefaultBranchRed, subject, project);
        let ctx = RunContext::new(now());

        assert_eq!(metric.value(&ctx).await, Some(1.0));
        assert_eq!(metric.status(&ctx).await, Status::Red);
    }

    #[test]
    fn formats_values_by_granularity() {
        assert_eq!(format_value(47.0, ValueGranularity::Integer), "47");
        assert_eq!(format_value(85.26, ValueGranularity::Percentage), "85.3");
        assert_eq!(format_value(85.0, ValueGranularity::Percentage), "85");
    }
}
