// Project configuration: subjects, metric options, debt targets and the
// project definition file they are loaded from.

pub mod dashboard;
pub mod definition;
pub mod error;
pub mod project;
pub mod requirement;
pub mod subject;
pub mod target;

pub use dashboard::{Dashboard, DashboardCell, DashboardColumn};
pub use definition::{
    load_project, ProjectDefinition, SourceDefinition, DOCUMENTS_SHORT_NAME, PROJECT_SHORT_NAME,
};
pub use error::ConfigurationError;
pub use project::Project;
pub use requirement::Requirement;
pub use subject::{MetricOptions, Subject, SubjectKind};
pub use target::{DebtTarget, DynamicTechnicalDebtTarget, TechnicalDebtTarget, ValueGranularity};
