use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "quality-report")]
#[command(about = "Measure software quality metrics and track their status over time")]
#[command(long_about = "quality-report queries CI servers, version control, issue trackers and report \
                       files for the metrics a project signs up for, classifies each metric against its \
                       targets and appends the outcome to a history file. Get started with \
                       'quality-report check' to validate your project definition.")]
pub struct Cli {
    /// Configuration file (default: quality-report.toml when present)
    #[arg(long, global = true, help = "Path to a quality-report.toml configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one report: measure every metric, append history and write the JSON report
    Report {
        /// Project definition file
        #[arg(long, help = "Project definition (TOML); overrides the configured project_file")]
        project: Option<PathBuf>,
        /// History file
        #[arg(long, help = "History log (JSON lines); overrides the configured history_file")]
        history: Option<PathBuf>,
        /// Output file for the JSON report (default: stdout)
        #[arg(long, help = "File path to write the JSON report (prints to stdout if not specified)")]
        output: Option<PathBuf>,
        /// Show norms, status durations and source links in the summary
        #[arg(long, help = "Include norms, status start dates and source links in the summary")]
        detailed: bool,
    },
    /// Show the recorded statuses of one metric
    History {
        /// Metric id, for example PC-1
        metric_id: String,
        /// History file
        #[arg(long, help = "History log (JSON lines); overrides the configured history_file")]
        history: Option<PathBuf>,
    },
    /// Validate the project definition without querying any source
    Check {
        /// Project definition file
        #[arg(long, help = "Project definition (TOML); overrides the configured project_file")]
        project: Option<PathBuf>,
    },
}
