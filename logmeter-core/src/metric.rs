//! Metric record and metric kinds

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// METRIC KIND
// ============================================================================

/// Kind of a metric. Serialized as its numeric type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MetricKind {
    /// Monotonic accumulation (`inc`, `add`)
    #[default]
    Counter,
    /// Last observed value (`set`)
    Gauge,
    /// Duration measurement
    Timer,
}

impl MetricKind {
    /// Numeric type code used by the JSON and CSV exports.
    pub fn code(self) -> u8 {
        match self {
            MetricKind::Counter => 0,
            MetricKind::Gauge => 1,
            MetricKind::Timer => 2,
        }
    }
}

impl From<MetricKind> for u8 {
    fn from(kind: MetricKind) -> Self {
        kind.code()
    }
}

impl TryFrom<u8> for MetricKind {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(MetricKind::Counter),
            1 => Ok(MetricKind::Gauge),
            2 => Ok(MetricKind::Timer),
            other => Err(format!("unknown metric type code {}", other)),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Timer => "timer",
        };
        f.write_str(name)
    }
}

// ============================================================================
// METRIC
// ============================================================================

/// A named, typed, tagged value updated by program builtins.
///
/// Tags are kept in a `BTreeMap` so exports list them in a stable order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub time: Timestamp,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub unit: String,
    pub tags: BTreeMap<String, String>,
}

impl Metric {
    /// Create a zero-valued metric with no unit and no tags.
    pub fn new(name: impl Into<String>, kind: MetricKind, time: Timestamp) -> Self {
        Self {
            name: name.into(),
            value: 0.0,
            time,
            kind,
            unit: String::new(),
            tags: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_kind_serializes_as_type_code() -> Result<(), serde_json::Error> {
        let time = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default();
        let mut metric = Metric::new("requests", MetricKind::Gauge, time);
        metric.tags.insert("host".to_string(), "web1".to_string());

        let json = serde_json::to_value(&metric)?;
        assert_eq!(json["name"], "requests");
        assert_eq!(json["type"], 1);
        assert_eq!(json["unit"], "");
        assert_eq!(json["tags"]["host"], "web1");

        let back: Metric = serde_json::from_value(json)?;
        assert_eq!(back, metric);
        Ok(())
    }

    #[test]
    fn test_unknown_type_code_rejected() {
        let result: Result<MetricKind, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MetricKind::Counter.to_string(), "counter");
        assert_eq!(MetricKind::Timer.code(), 2);
    }
}
