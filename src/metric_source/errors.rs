use std::time::Duration;
use thiserror::Error;

use super::Capability;

/// Failures inside a metric source. They stay inside the source layer: the
/// query cache logs them and records an unknown reading.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_name} does not provide {capability:?} facts")]
    Unsupported {
        source_name: String,
        capability: Capability,
    },

    #[error("Unknown fact '{0}'")]
    UnknownFact(String),

    #[error("No identifiers given")]
    MissingIdentifier,

    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl SourceError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::GitHub(octocrab::Error::GitHub { source, .. }) => {
                let code = source.status_code.as_u16();
                code == 429 || code >= 500
            }
            SourceError::GitHub(octocrab::Error::Http { .. }) => true,
            SourceError::Io(error) => matches!(
                error.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            SourceError::Timeout(_) => true,
            _ => false,
        }
    }
}
