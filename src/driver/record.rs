//! Folds iteration outcomes into the result summary.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::Protocol;
use crate::scenario::TestType;
use crate::thresholds::MetricThresholds;
use crate::types::{
    CheckSummary, ErrorBreakdown, Group, MetricSummary, RunState, RunSummary, ThresholdOutcome,
};

use super::{FailureKind, IterationOutcome};

const TREND_PERCENTILES: [u8; 3] = [90, 95, 99];

/// avg/min/max/med and nearest-rank percentiles over millisecond samples.
pub fn trend(samples: &[f64]) -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();
    if samples.is_empty() {
        return values;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    values.insert("avg".to_string(), sorted.iter().sum::<f64>() / n as f64);
    values.insert("min".to_string(), sorted[0]);
    values.insert("max".to_string(), sorted[n - 1]);
    let med = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    values.insert("med".to_string(), med);
    for p in TREND_PERCENTILES {
        let idx = ((p as f64 / 100.0) * n as f64) as usize;
        values.insert(format!("p({p})"), sorted[idx.min(n - 1)]);
    }
    values
}

fn rate(trues: u64, total: u64) -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();
    let ratio = if total > 0 {
        trues as f64 / total as f64
    } else {
        0.0
    };
    values.insert("rate".to_string(), ratio);
    values.insert("passes".to_string(), trues as f64);
    values.insert("fails".to_string(), (total - trues) as f64);
    values
}

fn counter(count: u64, elapsed: Duration) -> BTreeMap<String, f64> {
    let secs = elapsed.as_secs_f64();
    let mut values = BTreeMap::new();
    values.insert("count".to_string(), count as f64);
    values.insert(
        "rate".to_string(),
        if secs > 0.0 { count as f64 / secs } else { 0.0 },
    );
    values
}

fn gauge(value: u32) -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();
    values.insert("value".to_string(), value as f64);
    values
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

pub struct RunContext<'a> {
    pub test_type: TestType,
    pub protocol: Protocol,
    pub vus: u32,
    pub elapsed: Duration,
    pub thresholds: &'a MetricThresholds,
}

pub fn summarize(ctx: &RunContext<'_>, outcomes: &[IterationOutcome]) -> RunSummary {
    let iterations = outcomes.len() as u64;
    let iteration_ms: Vec<f64> = outcomes.iter().map(|o| millis(o.duration)).collect();

    let mut request_ms = Vec::new();
    let mut bytes_sent = 0;
    let mut bytes_received = 0;
    let mut breakdown = ErrorBreakdown::default();
    let mut checks: Vec<CheckSummary> = Vec::new();

    for outcome in outcomes {
        match &outcome.result {
            Ok(exchange) => {
                request_ms.push(millis(exchange.latency));
                bytes_sent += exchange.bytes_sent;
                bytes_received += exchange.bytes_received;
                for check in &exchange.checks {
                    let idx = match checks.iter().position(|c| c.name == check.name) {
                        Some(idx) => idx,
                        None => {
                            checks.push(CheckSummary {
                                name: check.name.to_string(),
                                ..Default::default()
                            });
                            checks.len() - 1
                        }
                    };
                    if check.passed {
                        checks[idx].passes += 1;
                    } else {
                        checks[idx].fails += 1;
                    }
                }
            }
            Err(failure) => request_ms.push(millis(failure.latency)),
        }
        match outcome.failure_kind() {
            Some(FailureKind::Timeout) => breakdown.timeouts += 1,
            Some(FailureKind::Connection) => breakdown.connection_errors += 1,
            Some(FailureKind::FailedCheck) => breakdown.failed_checks += 1,
            Some(FailureKind::Other) => breakdown.other += 1,
            None => {}
        }
    }

    let check_passes: u64 = checks.iter().map(|c| c.passes).sum();
    let check_total: u64 = checks.iter().map(|c| c.passes + c.fails).sum();

    let mut metrics = BTreeMap::new();
    metrics.insert(
        "iterations".to_string(),
        MetricSummary::new("counter", counter(iterations, ctx.elapsed)),
    );
    metrics.insert(
        "iteration_duration".to_string(),
        MetricSummary::new("trend", trend(&iteration_ms)),
    );
    metrics.insert(
        ctx.protocol.request_duration_metric().to_string(),
        MetricSummary::new("trend", trend(&request_ms)),
    );
    metrics.insert(
        "errors".to_string(),
        MetricSummary::new("rate", rate(breakdown.total(), iterations)),
    );
    metrics.insert(
        "checks".to_string(),
        MetricSummary::new("rate", rate(check_passes, check_total)),
    );
    metrics.insert(
        "data_sent".to_string(),
        MetricSummary::new("counter", counter(bytes_sent, ctx.elapsed)),
    );
    metrics.insert(
        "data_received".to_string(),
        MetricSummary::new("counter", counter(bytes_received, ctx.elapsed)),
    );
    metrics.insert("vus".to_string(), MetricSummary::new("gauge", gauge(ctx.vus)));
    metrics.insert("vus_max".to_string(), MetricSummary::new("gauge", gauge(ctx.vus)));
    if ctx.protocol == Protocol::Http {
        metrics.insert(
            "http_reqs".to_string(),
            MetricSummary::new("counter", counter(iterations, ctx.elapsed)),
        );
        metrics.insert(
            "http_req_failed".to_string(),
            MetricSummary::new("rate", rate(breakdown.total(), iterations)),
        );
    }

    for (name, criteria) in ctx.thresholds.iter() {
        let metric = metrics.entry(name.to_string()).or_default();
        let outcomes = criteria
            .iter()
            .map(|c| {
                let ok = c.evaluate(&metric.values).unwrap_or(false);
                (c.to_string(), ThresholdOutcome { ok })
            })
            .collect();
        metric.thresholds = Some(outcomes);
    }

    RunSummary {
        test_type: Some(ctx.test_type.to_string()),
        protocol: Some(ctx.protocol.to_string()),
        state: RunState {
            test_run_duration_ms: millis(ctx.elapsed),
        },
        metrics,
        root_group: Group {
            name: String::new(),
            checks,
        },
        error_breakdown: Some(breakdown),
    }
}
