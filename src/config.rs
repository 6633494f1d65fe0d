use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::metric_source::{RetryConfig, SourceSettings};

/// Main configuration structure for the quality report
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct QualityReportConfig {
    /// Input and output locations
    pub paths: PathsConfig,
    /// Report engine settings
    pub engine: EngineConfig,
    /// Metric source access
    pub sources: SourcesConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Project definition (TOML)
    pub project_file: PathBuf,
    /// Append-only history, one JSON object per line
    pub history_file: PathBuf,
    /// Where the JSON report is written; stdout when unset
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Metric values fetched at the same time
    pub max_concurrent_fetches: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Timeout of a single source call
    pub timeout_seconds: u64,
    /// GitHub API token (can be set via env var)
    pub github_token: Option<String>,
    pub github_requests_per_second: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level, overridden by RUST_LOG
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_file: PathBuf::from("project.toml"),
            history_file: PathBuf::from("history.jsonl"),
            output_file: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: crate::report::DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            timeout_seconds: 30,
            github_token: None, // Read from env var or the config file
            github_requests_per_second: 1,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl QualityReportConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (quality-report.toml, or `path` when given)
    /// 3. Environment variables (prefixed with QUALITY_REPORT, sections split by `__`)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None => {
                if Path::new("quality-report.toml").exists() {
                    builder = builder.add_source(File::with_name("quality-report"));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("QUALITY_REPORT")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: QualityReportConfig = builder.build()?.try_deserialize()?;

        if config.sources.github_token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                if !token.is_empty() {
                    config.sources.github_token = Some(token);
                }
            }
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Settings handed to every metric source. Relative paths in the project
    /// definition resolve against `base_dir`.
    pub fn source_settings(&self, base_dir: impl Into<PathBuf>) -> SourceSettings {
        SourceSettings {
            retry: RetryConfig {
                max_attempts: self.sources.retry_attempts.max(1),
                base_delay: Duration::from_millis(self.sources.retry_base_delay_ms),
                max_delay: Duration::from_millis(self.sources.retry_max_delay_ms),
                timeout: Duration::from_secs(self.sources.timeout_seconds),
                jitter: true,
            },
            github_token: self.sources.github_token.clone(),
            github_requests_per_second: self.sources.github_requests_per_second,
            base_dir: base_dir.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quality-report.toml");

        let mut config = QualityReportConfig::default();
        config.engine.max_concurrent_fetches = 2;
        config.observability.json_logs = true;
        config.save_to_file(&path).unwrap();

        let loaded = QualityReportConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.engine.max_concurrent_fetches, 2);
        assert!(loaded.observability.json_logs);
        assert_eq!(loaded.paths.history_file, PathBuf::from("history.jsonl"));
        assert_eq!(loaded.sources.retry_attempts, 3);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[sources]\ntimeout_seconds = 5\n").unwrap();

        let loaded = QualityReportConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.sources.timeout_seconds, 5);
        assert_eq!(loaded.sources.retry_base_delay_ms, 500);
        assert_eq!(loaded.observability.log_level, "info");
    }

    #[test]
    fn source_settings_follow_config() {
        let mut config = QualityReportConfig::default();
        config.sources.retry_attempts = 0;
        config.sources.timeout_seconds = 7;
        config.sources.github_token = Some("token".to_string());

        let settings = config.source_settings("/tmp/project");
        assert_eq!(settings.retry.max_attempts, 1);
        assert_eq!(settings.retry.timeout, Duration::from_secs(7));
        assert_eq!(settings.github_token.as_deref(), Some("token"));
        assert_eq!(settings.base_dir, PathBuf::from("/tmp/project"));
    }
}
