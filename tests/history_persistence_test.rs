// History file behaviour across report runs

use chrono::{DateTime, TimeZone, Utc};
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

use quality_report::clock::MockClock;
use quality_report::metric_source::fake::FakeSource;
use quality_report::{History, Project, ReportRunner, Requirement, SourceKind, Status, Subject, SubjectKind};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, hour, 0, 0).unwrap()
}

fn project(bugs: f64) -> Arc<Project> {
    let tracker = Arc::new(FakeSource::new("tracker").with_number("open_issues:bug", bugs));
    Arc::new(
        Project::new(
            "Org",
            Subject::new(SubjectKind::Project, "Quality", "PC")
                .with_requirements([Requirement::TrackBugs])
                .with_source_ids("tracker", ["org/repo"]),
        )
        .with_source(SourceKind::IssueTracker, tracker),
    )
}

async fn run(now: DateTime<Utc>, bugs: f64, history: &mut History) -> quality_report::ReportOutput {
    let mut clock = MockClock::new();
    clock.expect_now().return_const(now);
    ReportRunner::new(Arc::new(clock)).run(project(bugs), history).await
}

#[tokio::test]
async fn test_runs_are_appended_as_json_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");

    let mut history = History::load(&path).await.unwrap();
    run(at(8), 10.0, &mut history).await;
    run(at(9), 70.0, &mut history).await;

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["metrics"]["PC-1"]["status"], "green");
    assert_eq!(first["metrics"]["PC-1"]["value"], 10.0);

    let reloaded = History::load(&path).await.unwrap();
    assert_eq!(reloaded.len(), 2);
    let statuses: Vec<Status> = reloaded.statuses_for("PC-1").map(|(_, _, status)| status).collect();
    assert_eq!(statuses, vec![Status::Green, Status::Yellow]);
}

#[tokio::test]
async fn test_torn_final_record_does_not_block_next_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");

    let mut history = History::load(&path).await.unwrap();
    run(at(8), 120.0, &mut history).await;
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"timestamp":"2024-06-10T09:00:00Z","metr"#).unwrap();
    }

    let mut history = History::load(&path).await.unwrap();
    assert_eq!(history.len(), 1);

    let output = run(at(10), 120.0, &mut history).await;
    assert!(output.history_recorded);
    let metric = output.metric("PC-1").unwrap();
    assert_eq!(metric.status, Status::Red);
    assert_eq!(metric.status_start_date, at(8));

    let reloaded = History::load(&path).await.unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 3);
}

#[tokio::test]
async fn test_unwritable_history_still_produces_report() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");
    let mut history = History::load(&path).await.unwrap();
    // A directory in place of the file makes the append fail.
    std::fs::create_dir(&path).unwrap();

    let output = run(at(8), 1.0, &mut history).await;

    assert!(!output.history_recorded);
    assert_eq!(output.metric("PC-1").map(|m| m.status), Some(Status::Green));
    assert!(history.is_empty());
}
