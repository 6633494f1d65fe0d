use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use super::{ensure_capability, Capability, FactRequest, FactValue, MetricSource, SourceError};

const CAPABILITIES: &[Capability] = &[Capability::Count, Capability::Percentage, Capability::Date];

/// Reads facts from JSON report files, e.g. exported code quality or test
/// results. Identifiers are file paths relative to the project definition;
/// facts are dotted paths into the document (`alerts.high`).
///
/// Counts over several files are summed, percentages averaged and dates
/// report the oldest.
#[derive(Debug, Clone)]
pub struct JsonReportSource {
    id: String,
    name: String,
    url: Option<String>,
    base_dir: PathBuf,
}

impl JsonReportSource {
    pub fn new(id: &str, name: &str, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: None,
            base_dir: base_dir.into(),
        }
    }

    /// Where the reports are published, used for drill-down urls.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.trim_end_matches('/').to_string());
        self
    }

    async fn read(&self, id: &str) -> Result<Value, SourceError> {
        let path = self.base_dir.join(id);
        debug!(source = %self.id, path = %path.display(), "Reading JSON report");
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Look up a dotted path such as `alerts.high` in a JSON document.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |value, key| match value {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|index| items.get(index)),
            _ => None,
        })
}

fn parse_number(value: &Value, fact: &str) -> Result<f64, SourceError> {
    value
        .as_f64()
        .ok_or_else(|| SourceError::InvalidData(format!("'{fact}' is not a number: {value}")))
}

fn parse_date(value: &Value, fact: &str) -> Result<DateTime<Utc>, SourceError> {
    let text = value
        .as_str()
        .ok_or_else(|| SourceError::InvalidData(format!("'{fact}' is not a date: {value}")))?;
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
        .ok_or_else(|| SourceError::InvalidData(format!("'{fact}' is not a date: {text}")))
}

#[async_trait]
impl MetricSource for JsonReportSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[Capability] {
        CAPABILITIES
    }

    fn metric_source_urls(&self, ids: &[String]) -> Vec<String> {
        ids.iter()
            .map(|id| match &self.url {
                Some(url) => format!("{url}/{id}"),
                None => self.base_dir.join(id).to_string_lossy().into_owned(),
            })
            .collect()
    }

    async fn fact(&self, request: &FactRequest, ids: &[String]) -> Result<FactValue, SourceError> {
        ensure_capability(self, request)?;
        if ids.is_empty() {
            return Err(SourceError::MissingIdentifier);
        }

        let mut values = Vec::with_capacity(ids.len());
        for id in ids {
            let document = self.read(id).await?;
            let value = lookup(&document, &request.fact)
                .cloned()
                .ok_or_else(|| SourceError::UnknownFact(request.fact.clone()))?;
            values.push(value);
        }

        match request.capability {
            Capability::Count => {
                let mut total = 0.0;
                for value in &values {
                    total += parse_number(value, &request.fact)?;
                }
                Ok(FactValue::Number(total))
            }
            Capability::Percentage => {
                let mut total = 0.0;
                for value in &values {
                    total += parse_number(value, &request.fact)?;
                }
                Ok(FactValue::Number(total / values.len() as f64))
            }
            Capability::Date => {
                let mut oldest: Option<DateTime<Utc>> = None;
                for value in &values {
                    let date = parse_date(value, &request.fact)?;
                    oldest = Some(oldest.map_or(date, |current| current.min(date)));
                }
                oldest.map(FactValue::Date).ok_or(SourceError::MissingIdentifier)
            }
            Capability::Flag => Err(SourceError::Unsupported {
                source_name: self.name.clone(),
                capability: Capability::Flag,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn reports() -> TempDir {
        let dir = TempDir::new().unwrap();
        let write = |name: &str, value: Value| {
            std::fs::write(dir.path().join(name), value.to_string()).unwrap();
        };
        write(
            "backend.json",
            json!({
                "ncloc": 1200, "line_coverage": 80.0,
                "alerts": { "high": 2 },
                "date": "2024-01-10T12:00:00Z"
            }),
        );
        write(
            "frontend.json",
            json!({
                "ncloc": 300, "line_coverage": 90.0,
                "alerts": { "high": 1 },
                "date": "2023-12-01"
            }),
        );
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        dir
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn looks_up_dotted_paths() {
        let document = json!({ "a": { "b": [10, 20] } });
        assert_eq!(lookup(&document, "a.b.1"), Some(&json!(20)));
        assert_eq!(lookup(&document, "a.c"), None);
    }

    #[tokio::test]
    async fn sums_counts_and_averages_percentages() {
        let dir = reports();
        let source = JsonReportSource::new("reports", "Reports", dir.path());
        let both = ids(&["backend.json", "frontend.json"]);

        let count = source
            .fact(&FactRequest::new(Capability::Count, "alerts.high"), &both)
            .await
            .unwrap();
        assert_eq!(count, FactValue::Number(3.0));

        let coverage = source
            .fact(&FactRequest::new(Capability::Percentage, "line_coverage"), &both)
            .await
            .unwrap();
        assert_eq!(coverage, FactValue::Number(85.0));
    }

    #[tokio::test]
    async fn reports_the_oldest_date() {
        let dir = reports();
        let source = JsonReportSource::new("reports", "Reports", dir.path());
        let date = source
            .fact(
                &FactRequest::new(Capability::Date, "date"),
                &ids(&["backend.json", "frontend.json"]),
            )
            .await
            .unwrap();
        assert_eq!(
            date,
            FactValue::Date(Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn bad_reports_are_errors() {
        let dir = reports();
        let source = JsonReportSource::new("reports", "Reports", dir.path());
        let request = FactRequest::new(Capability::Count, "ncloc");

        assert!(matches!(
            source.fact(&request, &ids(&["broken.json"])).await,
            Err(SourceError::Json(_))
        ));
        assert!(matches!(
            source.fact(&request, &ids(&["missing.json"])).await,
            Err(SourceError::Io(_))
        ));
        assert!(matches!(
            source
                .fact(&FactRequest::new(Capability::Count, "nope"), &ids(&["backend.json"]))
                .await,
            Err(SourceError::UnknownFact(_))
        ));
        assert!(matches!(
            source
                .fact(&FactRequest::new(Capability::Count, "date"), &ids(&["backend.json"]))
                .await,
            Err(SourceError::InvalidData(_))
        ));
    }
}
