use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified state of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Perfect,
    Green,
    Yellow,
    Red,
    /// Missing data: no source, no identifier or the source failed.
    Grey,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Perfect,
        Status::Green,
        Status::Yellow,
        Status::Red,
        Status::Grey,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Perfect => "perfect",
            Status::Green => "green",
            Status::Yellow => "yellow",
            Status::Red => "red",
            Status::Grey => "grey",
        }
    }

    /// Whether the status means the norm is met.
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Perfect | Status::Green)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LowerIsBetter,
    HigherIsBetter,
}

impl Direction {
    /// Whether `value` is strictly worse than `threshold`.
    pub fn is_worse(self, value: f64, threshold: f64) -> bool {
        match self {
            Direction::LowerIsBetter => value > threshold,
            Direction::HigherIsBetter => value < threshold,
        }
    }
}

/// Movement of a metric's value since the previous report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Better,
    Worse,
    Unchanged,
    Unknown,
}

impl Trend {
    pub fn between(previous: Option<f64>, current: Option<f64>, direction: Direction) -> Self {
        match (previous, current) {
            (Some(previous), Some(current)) if direction.is_worse(current, previous) => Trend::Worse,
            (Some(previous), Some(current)) if direction.is_worse(previous, current) => Trend::Better,
            (Some(_), Some(_)) => Trend::Unchanged,
            _ => Trend::Unknown,
        }
    }
}
