use std::path::PathBuf;
use thiserror::Error;

/// Problems with the project definition. These are fatal at startup and can
/// never occur once a report run has begun.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Cannot read project definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed project definition: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown metric source kind '{0}'")]
    UnknownSourceKind(String),

    #[error("Unknown metric source type '{0}'")]
    UnknownSourceType(String),

    #[error("Metric source '{0}' is defined more than once")]
    DuplicateSource(String),

    #[error("Metric source kind '{kind}' is claimed by both '{first}' and '{second}'")]
    DuplicateSourceKind {
        kind: String,
        first: String,
        second: String,
    },

    #[error("Metric source '{0}' has no kind")]
    MissingSourceKind(String),

    #[error("{subject} refers to undefined metric source '{source_id}'")]
    UnknownSource { subject: String, source_id: String },

    #[error("Unknown metric class '{0}'")]
    UnknownMetricClass(String),

    #[error("Unknown requirement '{0}'")]
    UnknownRequirement(String),

    #[error("{subject} needs a two-character short name, got '{short_name}'")]
    InvalidShortName { subject: String, short_name: String },

    #[error("Short name '{0}' is used by more than one subject")]
    DuplicateShortName(String),

    #[error("Dashboard refers to unknown subject '{0}'")]
    UnknownDashboardSubject(String),

    #[error("Cannot set up metric source '{id}': {reason}")]
    Source { id: String, reason: String },
}
