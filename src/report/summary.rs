use super::output::ReportOutput;
use crate::history::History;
use crate::metric::{Status, Trend};

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Perfect => "⭐",
        Status::Green => "✅",
        Status::Yellow => "⚠️",
        Status::Red => "❌",
        Status::Grey => "❔",
    }
}

fn trend_arrow(trend: Trend) -> &'static str {
    match trend {
        Trend::Better => "↑",
        Trend::Worse => "↓",
        Trend::Unchanged => "→",
        Trend::Unknown => " ",
    }
}

/// Plain text renderings for the terminal.
pub struct ReportSummary;

impl ReportSummary {
    pub fn format_report(output: &ReportOutput, detailed: bool) -> String {
        let mut report = String::new();

        report.push_str(&format!("📊 QUALITY REPORT: {}\n", output.project));
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        report.push_str(&format!(
            "   Run {} on {} at {}\n\n",
            output.run_id,
            output.host,
            output.timestamp.format("%Y-%m-%d %H:%M UTC")
        ));

        report.push_str(&format!("🎯 {} METRICS\n", output.metric_count));
        for (status, count) in &output.counts_by_status {
            if *count > 0 {
                report.push_str(&format!("   {} {:<8} {}\n", status_icon(*status), status.as_str(), count));
            }
        }
        report.push('\n');

        for section in &output.sections {
            match &section.header.subtitle {
                Some(subtitle) => report.push_str(&format!(
                    "{} {} ({})\n",
                    section.header.id_prefix, section.header.title, subtitle
                )),
                None => report.push_str(&format!(
                    "{} {}\n",
                    section.header.id_prefix, section.header.title
                )),
            }
            for metric in &section.metrics {
                report.push_str(&format!(
                    "   {} {} {:<6} {}\n",
                    status_icon(metric.status),
                    trend_arrow(metric.trend),
                    metric.id,
                    metric.report
                ));
                if detailed {
                    report.push_str(&format!(
                        "            Norm: {}\n            {} since {}\n",
                        metric.norm,
                        metric.status,
                        metric.status_start_date.format("%Y-%m-%d")
                    ));
                    for (source, urls) in &metric.urls {
                        for url in urls {
                            report.push_str(&format!("            {source}: {url}\n"));
                        }
                    }
                }
            }
            report.push('\n');
        }

        if !output.history_recorded {
            report.push_str("⚠️  This run was not added to the history.\n");
        }
        if output.source_queries.failures > 0 {
            report.push_str(&format!(
                "⚠️  {} metric source queries failed; affected metrics are grey.\n",
                output.source_queries.failures
            ));
        }

        report
    }

    /// Status history of one metric, oldest first.
    pub fn format_history(history: &History, metric_id: &str) -> String {
        let mut report = String::new();
        report.push_str(&format!("📈 HISTORY OF {metric_id}\n"));

        let mut found = false;
        for (timestamp, value, status) in history.statuses_for(metric_id) {
            found = true;
            let value = value
                .map(|value| value.to_string())
                .unwrap_or_else(|| "?".to_string());
            report.push_str(&format!(
                "   {}  {} {:<8} {}\n",
                timestamp.format("%Y-%m-%d %H:%M"),
                status_icon(status),
                status.as_str(),
                value
            ));
        }
        if !found {
            report.push_str("   No recorded runs measured this metric.\n");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryEntry, MetricRecord};
    use chrono::{TimeZone, Utc};

    #[test]
    fn formats_metric_history() {
        let day = |n| Utc.with_ymd_and_hms(2024, 1, n, 9, 0, 0).unwrap();
        let history = History::from_entries(vec![
            HistoryEntry::new(day(1)).with_metric(
                "PR-1",
                MetricRecord { value: Some(3.0), status: Status::Yellow, timestamp: day(1) },
            ),
            HistoryEntry::new(day(2)).with_metric(
                "PR-1",
                MetricRecord { value: None, status: Status::Grey, timestamp: day(2) },
            ),
        ]);

        let text = ReportSummary::format_history(&history, "PR-1");
        assert!(text.contains("2024-01-01 09:00"));
        assert!(text.contains("yellow"));
        assert!(text.contains("grey"));

        let empty = ReportSummary::format_history(&history, "PR-9");
        assert!(empty.contains("No recorded runs"));
    }
}
