use anyhow::Result;
use clap::Parser;

use quality_report::cli::commands::check::CheckCommand;
use quality_report::cli::commands::history::HistoryCommand;
use quality_report::cli::commands::report::ReportCommand;
use quality_report::cli::commands::{show_how_to_get_started, Command};
use quality_report::cli::{Cli, Commands};
use quality_report::{init_telemetry, QualityReportConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    QualityReportConfig::load_env_file()?;
    let config = QualityReportConfig::load(cli.config.as_deref())?;
    init_telemetry(&config.observability)?;

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        None => runtime.block_on(show_how_to_get_started()),
        Some(Commands::Report {
            project,
            history,
            output,
            detailed,
        }) => runtime.block_on(async {
            ReportCommand::new(config)
                .with_project(project)
                .with_history(history)
                .with_output(output)
                .with_detailed(detailed)
                .execute()
                .await
        }),
        Some(Commands::History { metric_id, history }) => runtime.block_on(async {
            HistoryCommand::new(config, metric_id)
                .with_history(history)
                .execute()
                .await
        }),
        Some(Commands::Check { project }) => runtime.block_on(async {
            CheckCommand::new(config).with_project(project).execute().await
        }),
    }
}
