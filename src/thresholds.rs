//! Pass/fail criteria per test type.
//!
//! A single [`ThresholdSet`] is resolved per test type and both protocol views
//! are derived from it, so HTTP and gRPC runs of the same scenario are always
//! held to the same numbers. Only metric names differ between the views.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Value};

use crate::config::Protocol;
use crate::scenario::TestType;

const ITERATION_DURATION_P95_MS: f64 = 10_000.0;
const CHECKS_RATE_MIN: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Percentile(u8),
    Rate,
}

impl Stat {
    /// Key of this statistic inside a metric's `values` map.
    pub fn key(&self) -> String {
        match self {
            Stat::Percentile(p) => format!("p({p})"),
            Stat::Rate => "rate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Criterion {
    pub stat: Stat,
    pub op: Op,
    pub bound: f64,
}

impl Criterion {
    pub const fn below(stat: Stat, bound: f64) -> Self {
        Self {
            stat,
            op: Op::Lt,
            bound,
        }
    }

    pub const fn above(stat: Stat, bound: f64) -> Self {
        Self {
            stat,
            op: Op::Gt,
            bound,
        }
    }

    /// `None` when the metric carries no value for this statistic.
    pub fn evaluate(&self, values: &BTreeMap<String, f64>) -> Option<bool> {
        let observed = *values.get(&self.stat.key())?;
        Some(match self.op {
            Op::Lt => observed < self.bound,
            Op::Gt => observed > self.bound,
        })
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            Op::Lt => '<',
            Op::Gt => '>',
        };
        write!(f, "{}{}{}", self.stat.key(), op, self.bound)
    }
}

/// Protocol-independent numeric bars for one test type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSet {
    pub iteration_duration_p95_ms: f64,
    pub checks_rate_min: f64,
    pub req_duration_p95_ms: f64,
    pub error_rate_max: f64,
}

impl ThresholdSet {
    pub fn for_test_type(test_type: TestType) -> Self {
        let (req_duration_p95_ms, error_rate_max) = match test_type {
            TestType::Smoke => (1_000.0, 0.01),
            TestType::AverageLoad => (5_000.0, 0.02),
            TestType::Stress => (8_000.0, 0.05),
            TestType::Spike => (10_000.0, 0.10),
            TestType::Soak => (5_000.0, 0.02),
            TestType::Breakpoint => (15_000.0, 0.20),
        };
        Self {
            iteration_duration_p95_ms: ITERATION_DURATION_P95_MS,
            checks_rate_min: CHECKS_RATE_MIN,
            req_duration_p95_ms,
            error_rate_max,
        }
    }

    /// Resolve from a raw selector; unknown names use the smoke bars.
    pub fn resolve(name: Option<&str>) -> Self {
        Self::for_test_type(TestType::resolve(name))
    }

    pub fn view(&self, protocol: Protocol) -> MetricThresholds {
        let req_duration = Criterion::below(Stat::Percentile(95), self.req_duration_p95_ms);
        let error_rate = Criterion::below(Stat::Rate, self.error_rate_max);

        let mut view = BTreeMap::new();
        view.insert(
            "iteration_duration",
            vec![Criterion::below(
                Stat::Percentile(95),
                self.iteration_duration_p95_ms,
            )],
        );
        view.insert(
            "checks",
            vec![Criterion::above(Stat::Rate, self.checks_rate_min)],
        );
        view.insert(protocol.request_duration_metric(), vec![req_duration]);
        view.insert("errors", vec![error_rate]);
        if protocol == Protocol::Http {
            view.insert("http_req_failed", vec![error_rate]);
        }
        MetricThresholds(view)
    }
}

/// Criteria keyed by metric name, as handed to the load engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricThresholds(BTreeMap<&'static str, Vec<Criterion>>);

impl MetricThresholds {
    #[cfg(test)]
    pub fn get(&self, metric: &str) -> Option<&[Criterion]> {
        self.0.get(metric).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[Criterion])> {
        self.0.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn to_options(&self) -> Value {
        let map: serde_json::Map<String, Value> = self
            .0
            .iter()
            .map(|(metric, criteria)| {
                let exprs: Vec<String> = criteria.iter().map(Criterion::to_string).collect();
                (metric.to_string(), json!(exprs))
            })
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(view: &MetricThresholds, metric: &str) -> f64 {
        view.get(metric).expect("metric present")[0].bound
    }

    #[test]
    fn http_and_grpc_views_share_numbers_for_every_test_type() {
        for test_type in TestType::ALL {
            let set = ThresholdSet::for_test_type(test_type);
            let (http, grpc) = (set.view(Protocol::Http), set.view(Protocol::Grpc));

            assert_eq!(
                bound(&http, "http_req_duration"),
                bound(&grpc, "grpc_req_duration"),
                "{test_type}"
            );
            assert_eq!(bound(&http, "errors"), bound(&grpc, "errors"), "{test_type}");
            assert_eq!(bound(&http, "http_req_failed"), bound(&grpc, "errors"));
            assert_eq!(
                http.get("iteration_duration"),
                grpc.get("iteration_duration")
            );
            assert_eq!(http.get("checks"), grpc.get("checks"));
        }
    }

    #[test]
    fn average_load_http_expressions() {
        let http = ThresholdSet::resolve(Some("average_load")).view(Protocol::Http);
        let exprs = http.to_options();
        assert_eq!(exprs["http_req_duration"], json!(["p(95)<5000"]));
        assert_eq!(exprs["errors"], json!(["rate<0.02"]));
        assert_eq!(exprs["http_req_failed"], json!(["rate<0.02"]));
        assert_eq!(exprs["checks"], json!(["rate>0.95"]));
    }

    #[test]
    fn grpc_view_has_no_http_alias() {
        let grpc = ThresholdSet::for_test_type(TestType::Stress).view(Protocol::Grpc);
        assert!(grpc.get("http_req_failed").is_none());
        assert!(grpc.get("http_req_duration").is_none());
    }

    #[test]
    fn unknown_name_uses_smoke_bars() {
        assert_eq!(
            ThresholdSet::resolve(Some("does_not_exist")),
            ThresholdSet::for_test_type(TestType::Smoke)
        );
        assert_eq!(ThresholdSet::resolve(None), ThresholdSet::resolve(Some("smoke")));
    }

    #[test]
    fn criterion_evaluation() {
        let mut values = BTreeMap::new();
        values.insert("p(95)".to_string(), 4200.0);
        values.insert("rate".to_string(), 0.97);

        assert_eq!(
            Criterion::below(Stat::Percentile(95), 5000.0).evaluate(&values),
            Some(true)
        );
        assert_eq!(Criterion::above(Stat::Rate, 0.98).evaluate(&values), Some(false));
        assert_eq!(Criterion::below(Stat::Percentile(99), 1.0).evaluate(&values), None);
    }
}
