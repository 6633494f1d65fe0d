use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How finely a metric's values are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueGranularity {
    Integer,
    Percentage,
    Duration,
}

impl ValueGranularity {
    pub fn round(self, value: f64) -> f64 {
        match self {
            ValueGranularity::Integer | ValueGranularity::Duration => value.round(),
            ValueGranularity::Percentage => (value * 10.0).round() / 10.0,
        }
    }
}

/// A fixed accepted value for a metric that does not meet its target yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalDebtTarget {
    value: f64,
    #[serde(default)]
    explanation: String,
}

impl TechnicalDebtTarget {
    pub fn new(value: f64, explanation: impl Into<String>) -> Self {
        Self {
            value,
            explanation: explanation.into(),
        }
    }

    pub fn target_value(&self) -> f64 {
        self.value
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

/// An accepted value that moves linearly from a start anchor to an end anchor.
///
/// Before the start date the start value applies, after the end date the end
/// value applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DynamicTargetFields")]
pub struct DynamicTechnicalDebtTarget {
    start_value: f64,
    start_date: DateTime<Utc>,
    end_value: f64,
    end_date: DateTime<Utc>,
    #[serde(default)]
    explanation: String,
}

impl DynamicTechnicalDebtTarget {
    pub fn new(
        start_value: f64,
        start_date: DateTime<Utc>,
        end_value: f64,
        end_date: DateTime<Utc>,
        explanation: impl Into<String>,
    ) -> Self {
        // Anchors given in reverse order describe the same line.
        if end_date < start_date {
            return Self {
                start_value: end_value,
                start_date: end_date,
                end_value: start_value,
                end_date: start_date,
                explanation: explanation.into(),
            };
        }
        Self {
            start_value,
            start_date,
            end_value,
            end_date,
            explanation: explanation.into(),
        }
    }

    pub fn start(&self) -> (f64, DateTime<Utc>) {
        (self.start_value, self.start_date)
    }

    pub fn end(&self) -> (f64, DateTime<Utc>) {
        (self.end_value, self.end_date)
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Unrounded accepted value at `at`.
    pub fn interpolate(&self, at: DateTime<Utc>) -> f64 {
        if at <= self.start_date {
            return self.start_value;
        }
        if at >= self.end_date {
            return self.end_value;
        }
        let period = (self.end_date - self.start_date).num_milliseconds() as f64;
        let elapsed = (at - self.start_date).num_milliseconds() as f64;
        self.start_value + (self.end_value - self.start_value) * (elapsed / period)
    }

    pub fn target_value(&self, at: DateTime<Utc>, granularity: ValueGranularity) -> f64 {
        granularity.round(self.interpolate(at))
    }
}

#[derive(Deserialize)]
struct DynamicTargetFields {
    start_value: f64,
    start_date: DateTime<Utc>,
    end_value: f64,
    end_date: DateTime<Utc>,
    #[serde(default)]
    explanation: String,
}

impl From<DynamicTargetFields> for DynamicTechnicalDebtTarget {
    fn from(fields: DynamicTargetFields) -> Self {
        Self::new(
            fields.start_value,
            fields.start_date,
            fields.end_value,
            fields.end_date,
            fields.explanation,
        )
    }
}

/// Debt target as configured in a metric's options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DebtTarget {
    Dynamic(DynamicTechnicalDebtTarget),
    Static(TechnicalDebtTarget),
}

impl DebtTarget {
    pub fn accepted_value(&self, at: DateTime<Utc>, granularity: ValueGranularity) -> f64 {
        match self {
            DebtTarget::Static(target) => target.target_value(),
            DebtTarget::Dynamic(target) => target.target_value(at, granularity),
        }
    }

    pub fn explanation(&self) -> &str {
        match self {
            DebtTarget::Static(target) => target.explanation(),
            DebtTarget::Dynamic(target) => target.explanation(),
        }
    }
}

impl From<TechnicalDebtTarget> for DebtTarget {
    fn from(target: TechnicalDebtTarget) -> Self {
        DebtTarget::Static(target)
    }
}

impl From<DynamicTechnicalDebtTarget> for DebtTarget {
    fn from(target: DynamicTechnicalDebtTarget) -> Self {
        DebtTarget::Dynamic(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn major_violations_debt() -> DynamicTechnicalDebtTarget {
        DynamicTechnicalDebtTarget::new(47.0, date(2014, 2, 12), 25.0, date(2014, 6, 1), "")
    }

    #[test]
    fn static_target_is_constant() {
        let target = TechnicalDebtTarget::new(0.0, "Sonar incorrectly reports 0% coverage");
        assert_eq!(target.target_value(), 0.0);
        assert_eq!(target.explanation(), "Sonar incorrectly reports 0% coverage");
    }

    #[test]
    fn dynamic_target_clamps_before_first_anchor() {
        let target = major_violations_debt();
        assert_eq!(target.target_value(date(2013, 1, 1), ValueGranularity::Integer), 47.0);
        assert_eq!(target.target_value(date(2014, 2, 12), ValueGranularity::Integer), 47.0);
    }

    #[test]
    fn dynamic_target_clamps_after_last_anchor() {
        let target = major_violations_debt();
        assert_eq!(target.target_value(date(2014, 6, 1), ValueGranularity::Integer), 25.0);
        assert_eq!(target.target_value(date(2020, 1, 1), ValueGranularity::Integer), 25.0);
    }

    #[test]
    fn dynamic_target_midpoint_is_mean() {
        let target = DynamicTechnicalDebtTarget::new(40.0, date(2014, 1, 1), 20.0, date(2014, 1, 21), "");
        assert_eq!(target.target_value(date(2014, 1, 11), ValueGranularity::Integer), 30.0);
    }

    #[test]
    fn dynamic_target_rounds_to_granularity() {
        let target = DynamicTechnicalDebtTarget::new(0.0, date(2014, 1, 1), 10.0, date(2014, 1, 4), "");
        // One third of the way.
        assert_eq!(target.target_value(date(2014, 1, 2), ValueGranularity::Integer), 3.0);
        assert_eq!(target.target_value(date(2014, 1, 2), ValueGranularity::Percentage), 3.3);
    }

    #[test]
    fn reversed_anchors_describe_the_same_line() {
        let target = DynamicTechnicalDebtTarget::new(25.0, date(2014, 6, 1), 47.0, date(2014, 2, 12), "");
        assert_eq!(target.start(), (47.0, date(2014, 2, 12)));
        assert_eq!(target.end(), (25.0, date(2014, 6, 1)));
    }

    #[test]
    fn debt_target_deserializes_both_forms() {
        let dynamic: DebtTarget = serde_json::from_str(
            r#"{"start_value": 47, "start_date": "2014-02-12T00:00:00Z",
                "end_value": 25, "end_date": "2014-06-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(dynamic, DebtTarget::Dynamic(_)));

        let fixed: DebtTarget =
            serde_json::from_str(r#"{"value": 0, "explanation": "known false positive"}"#).unwrap();
        assert_eq!(fixed.accepted_value(date(2014, 1, 1), ValueGranularity::Integer), 0.0);
        assert_eq!(fixed.explanation(), "known false positive");
    }

    proptest! {
        #[test]
        fn interpolation_respects_anchors(
            start_value in -1000.0f64..1000.0,
            end_value in -1000.0f64..1000.0,
            start_day in 0i64..3650,
            span_days in 1i64..3650,
        ) {
            let start = date(2010, 1, 1) + chrono::Duration::days(start_day);
            let end = start + chrono::Duration::days(span_days);
            let target = DynamicTechnicalDebtTarget::new(start_value, start, end_value, end, "");

            prop_assert_eq!(target.interpolate(start - chrono::Duration::days(1)), start_value);
            prop_assert_eq!(target.interpolate(end + chrono::Duration::days(1)), end_value);

            let midpoint = start + (end - start) / 2;
            let mean = (start_value + end_value) / 2.0;
            prop_assert!((target.interpolate(midpoint) - mean).abs() < 1e-6);
        }
    }
}
