use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One metric in the result summary. `values` holds the aggregate keys the
/// load engine uses (`count`, `rate`, `avg`, `p(95)`, `passes`, ...).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MetricSummary {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<String>,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<BTreeMap<String, ThresholdOutcome>>,
}

impl MetricSummary {
    pub fn new(metric_type: &str, values: BTreeMap<String, f64>) -> Self {
        Self {
            metric_type: Some(metric_type.to_string()),
            values,
            thresholds: None,
        }
    }

    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdOutcome {
    pub ok: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub checks: Vec<CheckSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBreakdown {
    pub timeouts: u64,
    pub connection_errors: u64,
    pub failed_checks: u64,
    pub other: u64,
}

impl ErrorBreakdown {
    pub fn total(&self) -> u64 {
        self.timeouts + self.connection_errors + self.failed_checks + self.other
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RunState {
    #[serde(rename = "testRunDurationMs")]
    pub test_run_duration_ms: f64,
}

/// Result artifact written after a run. Field names match the load engine's
/// own JSON summary so both can be fed to the extractor.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default)]
    pub state: RunState,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricSummary>,
    #[serde(default)]
    pub root_group: Group,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_breakdown: Option<ErrorBreakdown>,
}

impl RunSummary {
    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }

    /// Every evaluated threshold passed.
    pub fn thresholds_ok(&self) -> bool {
        self.metrics
            .values()
            .filter_map(|m| m.thresholds.as_ref())
            .flat_map(|t| t.values())
            .all(|outcome| outcome.ok)
    }

    pub fn failed_thresholds(&self) -> Vec<String> {
        let mut failed = Vec::new();
        for (name, metric) in &self.metrics {
            if let Some(thresholds) = &metric.thresholds {
                for (expr, outcome) in thresholds {
                    if !outcome.ok {
                        failed.push(format!("{name}: {expr}"));
                    }
                }
            }
        }
        failed
    }
}

/// Side file written around each orchestrated run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimingRecord {
    pub test_name: String,
    pub run_number: u32,
    pub start_time: String,
    pub end_time: String,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub duration_seconds: i64,
}
