// Command line smoke tests against a project that only reads local report files

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PROJECT: &str = r#"
organization = "Example organization"
name = "Example project"

[[sources]]
id = "sonar"
kind = "code_quality"
type = "json_report"
name = "Sonar export"

[[products]]
name = "Backend"
short_name = "BE"
requirements = ["code_quality"]
[products.metric_source_ids]
sonar = "reports/sonar.json"
"#;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("reports")).unwrap();
    std::fs::write(dir.path().join("project.toml"), PROJECT).unwrap();
    std::fs::write(
        dir.path().join("reports/sonar.json"),
        r#"{"major_violations": 12, "critical_violations": 0, "ncloc": 5000}"#,
    )
    .unwrap();
    dir
}

fn quality_report(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quality-report").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_no_subcommand_shows_guidance() {
    let dir = TempDir::new().unwrap();
    quality_report(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("quality-report check"))
        .stdout(predicate::str::contains("quality-report report"));
}

#[test]
fn test_check_lists_sections() {
    let dir = workspace();
    quality_report(&dir)
        .args(["check", "--project", "project.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example project"))
        .stdout(predicate::str::contains("BE Backend"))
        .stdout(predicate::str::contains("3 metrics in 1 sections"));
}

#[test]
fn test_check_rejects_unknown_requirement() {
    let dir = workspace();
    std::fs::write(
        dir.path().join("broken.toml"),
        "name = \"Broken\"\nrequirements = [\"track_everything\"]\n",
    )
    .unwrap();

    quality_report(&dir)
        .args(["check", "--project", "broken.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("track_everything"));
}

#[test]
fn test_report_writes_json_and_history() {
    let dir = workspace();
    quality_report(&dir)
        .args(["report", "--output", "report.json", "--history", "history.jsonl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("QUALITY REPORT: Example project"))
        .stdout(predicate::str::contains("BE-1"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["metric_count"], 3);
    assert_eq!(report["sections"][0]["id_prefix"], "BE");
    assert_eq!(report["sections"][0]["metrics"][0]["status"], "green");
    assert_eq!(report["sections"][0]["metrics"][1]["status"], "perfect");

    let history = std::fs::read_to_string(dir.path().join("history.jsonl")).unwrap();
    assert_eq!(history.lines().count(), 1);

    quality_report(&dir)
        .args(["history", "BE-1", "--history", "history.jsonl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HISTORY OF BE-1"))
        .stdout(predicate::str::contains("green"));
}
