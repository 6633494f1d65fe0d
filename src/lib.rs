// Quality Report Library - metric status evaluation and history tracking
// This exposes the core components for testing and integration

pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod history;
pub mod metric;
pub mod metric_source;
pub mod observability;
pub mod report;
pub mod telemetry;

// Re-export key types for easy access
pub use clock::{Clock, SystemClock};
pub use config::{ObservabilityConfig, QualityReportConfig};
pub use domain::{
    load_project, ConfigurationError, DebtTarget, DynamicTechnicalDebtTarget, Project, ProjectDefinition,
    Requirement, Subject, SubjectKind, TechnicalDebtTarget,
};
pub use history::{History, HistoryEntry, HistoryError, MetricRecord, StatusCounts};
pub use metric::{classify, Measurement, Metric, MetricKind, MetricResult, RunContext, Status, Thresholds, Trend};
pub use metric_source::{
    Capability, FactRequest, FactValue, MetricSource, QueryCache, SourceError, SourceKind, SourceSettings,
};
pub use observability::{OperationTimer, SourceQueryMetrics, SourceQueryStats};
pub use report::{QualityReport, ReportOutput, ReportRunner, ReportSummary, Section};
pub use telemetry::{create_run_span, generate_run_id, init_telemetry};
