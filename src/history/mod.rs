//! Append-only log of past report runs, one JSON object per line.
//!
//! Each line is a [`HistoryEntry`]: the run timestamp and, per metric id,
//! the value and status measured in that run. Readers skip lines they cannot
//! parse so a torn write never hides the rest of the history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metric::{Direction, Status, Trend};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot serialize history entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("History writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One metric in one report run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub value: Option<f64>,
    pub status: Status,
    /// Since when the metric has had this status.
    pub timestamp: DateTime<Utc>,
}

/// Everything recorded for one report run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricRecord>,
}

impl HistoryEntry {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metric(mut self, id: impl Into<String>, record: MetricRecord) -> Self {
        self.metrics.insert(id.into(), record);
        self
    }
}

/// Number of metrics per status in one run, for the dashboard chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCounts {
    pub timestamp: DateTime<Utc>,
    pub counts: BTreeMap<Status, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct History {
    path: Option<PathBuf>,
    entries: Vec<HistoryEntry>,
}

impl History {
    /// History kept only in memory; `record` does not persist.
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.sort_by_key(|entry| entry.timestamp);
        Self {
            path: None,
            entries,
        }
    }

    /// Read the log at `path`. A missing file is an empty history.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No history yet");
                String::new()
            }
            Err(error) => return Err(error.into()),
        };

        let mut entries = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        line = number + 1,
                        error = %error,
                        "Skipping unreadable history record"
                    );
                }
            }
        }
        entries.sort_by_key(|entry| entry.timestamp);
        debug!(path = %path.display(), entries = entries.len(), "History loaded");

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append one run. Returns `false` when that run timestamp is already
    /// recorded, in which case nothing is written.
    pub async fn record(&mut self, entry: HistoryEntry) -> Result<bool, HistoryError> {
        if self.entries.iter().any(|existing| existing.timestamp == entry.timestamp) {
            debug!(timestamp = %entry.timestamp, "Run already recorded");
            return Ok(false);
        }

        if let Some(path) = self.path.clone() {
            let line = serde_json::to_string(&entry)?;
            tokio::task::spawn_blocking(move || append_line(&path, &line)).await??;
            info!(timestamp = %entry.timestamp, metrics = entry.metrics.len(), "History recorded");
        }

        let position = self
            .entries
            .partition_point(|existing| existing.timestamp < entry.timestamp);
        self.entries.insert(position, entry);
        Ok(true)
    }

    /// (run timestamp, value, status) of a metric, oldest first. Runs that
    /// did not measure the metric are left out.
    pub fn statuses_for<'a>(
        &'a self,
        metric_id: &'a str,
    ) -> impl Iterator<Item = (DateTime<Utc>, Option<f64>, Status)> + 'a {
        self.entries.iter().filter_map(move |entry| {
            entry
                .metrics
                .get(metric_id)
                .map(|record| (entry.timestamp, record.value, record.status))
        })
    }

    pub fn latest_for(&self, metric_id: &str) -> Option<(DateTime<Utc>, &MetricRecord)> {
        self.entries.iter().rev().find_map(|entry| {
            entry
                .metrics
                .get(metric_id)
                .map(|record| (entry.timestamp, record))
        })
    }

    /// Timestamp of the oldest run in the unbroken streak of `status` that
    /// ends with the latest run, or `now` when the latest run had another
    /// status.
    pub fn status_start_date(&self, metric_id: &str, status: Status, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut start = now;
        for entry in self.entries.iter().rev() {
            let Some(record) = entry.metrics.get(metric_id) else {
                continue;
            };
            if record.status != status {
                break;
            }
            start = start.min(entry.timestamp);
        }
        start
    }

    pub fn trend(&self, metric_id: &str, value: Option<f64>, direction: Direction) -> Trend {
        let previous = self.latest_for(metric_id).and_then(|(_, record)| record.value);
        Trend::between(previous, value, direction)
    }

    pub fn value_series<'a>(
        &'a self,
        metric_id: &'a str,
    ) -> impl Iterator<Item = (DateTime<Utc>, Option<f64>)> + 'a {
        self.statuses_for(metric_id)
            .map(|(timestamp, value, _)| (timestamp, value))
    }

    pub fn status_count_series(&self) -> Vec<StatusCounts> {
        self.entries
            .iter()
            .map(|entry| {
                let mut counts = BTreeMap::new();
                for record in entry.metrics.values() {
                    *counts.entry(record.status).or_insert(0) += 1;
                }
                StatusCounts {
                    timestamp: entry.timestamp,
                    counts,
                }
            })
            .collect()
    }
}

/// Append `line` under an exclusive lock, repairing a missing trailing
/// newline left by an interrupted write.
fn append_line(path: &Path, line: &str) -> Result<(), HistoryError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;
    let mut lock = fd_lock::RwLock::new(file);
    let mut guard = lock.write()?;

    let mut content = String::with_capacity(line.len() + 2);
    if guard.metadata()?.len() > 0 {
        let mut last = [0u8; 1];
        guard.seek(SeekFrom::End(-1))?;
        guard.read_exact(&mut last)?;
        if last[0] != b'\n' {
            warn!(path = %path.display(), "History file ends in a partial record");
            content.push('\n');
        }
    }
    content.push_str(line);
    content.push('\n');
    guard.write_all(content.as_bytes())?;
    guard.flush()?;
    Ok(())
}
