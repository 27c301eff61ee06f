//! Post-run metric extraction.
//!
//! Reads the result summaries, container metric dumps and service logs an
//! orchestrated test leaves behind and writes per-test aggregates. Unreadable
//! files are skipped with a warning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::driver::record::trend;
use crate::error::{Error, Result};
use crate::orchestrate::{ContainerMetric, LOGS_SUFFIX};
use crate::types::RunSummary;

pub const AVERAGE_RUN_METRICS: &str = "average_run_metrics.json";
pub const AVERAGE_CONTAINER_METRICS: &str = "average_container_metrics.json";
pub const SERVICE_LOG_METRICS: &str = "cloudwatch_logs_metrics.json";
pub const AVERAGE_LOG_METRICS: &str = "average_cloudwatch_logs_metrics.json";

/// Logged latencies above this are outliers and dropped.
const MAX_LOG_LATENCY: f64 = 1.0;
const LOG_OPERATIONS: [&str; 2] = ["serialize", "deserialize"];

const DURATION_STATS: [(&str, &str); 7] = [
    ("avg", "avg"),
    ("min", "min"),
    ("max", "max"),
    ("med", "median"),
    ("p(90)", "p90"),
    ("p(95)", "p95"),
    ("p(99)", "p99"),
];

/// Flatten the interesting parts of one result summary.
pub fn run_metrics(summary: &RunSummary) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    let mut copy = |metric: &str, key: &str, name: String| {
        if let Some(v) = summary.metric(metric) {
            out.insert(name, v.value(key).unwrap_or(0.0));
        }
    };

    for (metric, prefix) in [("data_sent", "data_sent"), ("data_received", "data_received")] {
        copy(metric, "count", format!("{prefix}_count"));
        copy(metric, "rate", format!("{prefix}_rate"));
    }

    let is_http = summary.metric("http_req_duration").is_some();
    let duration_metric = if is_http {
        "http_req_duration"
    } else {
        "grpc_req_duration"
    };
    for (key, suffix) in DURATION_STATS {
        copy(duration_metric, key, format!("request_duration_{suffix}"));
    }

    copy("vus_max", "value", "vus_max".to_string());

    let throughput_metric = if is_http { "http_reqs" } else { "iterations" };
    copy(
        throughput_metric,
        "rate",
        "throughput_requests_per_second".to_string(),
    );
    copy(
        throughput_metric,
        "count",
        "throughput_total_requests".to_string(),
    );

    copy("checks", "rate", "success_rate_rate".to_string());
    copy("checks", "passes", "success_rate_passes".to_string());
    copy("checks", "fails", "success_rate_fails".to_string());

    out
}

/// Average each key over the inputs that contain it.
pub fn average(all: &[BTreeMap<String, f64>]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, u32)> = BTreeMap::new();
    for metrics in all {
        for (key, value) in metrics {
            let entry = sums.entry(key.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(key, (sum, n))| (key, sum / n as f64))
        .collect()
}

fn matching_files(dir: &Path, matches: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(&matches)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn is_results_file(name: &str) -> bool {
    name.starts_with("results_") && name.contains("_run_") && name.ends_with(".json")
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let raw = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_slice(&raw)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_vec_pretty(value)?).map_err(|e| Error::io(path, e))
}

/// Average the result summaries in `dir` and write [`AVERAGE_RUN_METRICS`].
/// Returns `None` when no summary could be read.
pub fn process_results(dir: &Path) -> Result<Option<BTreeMap<String, f64>>> {
    let files = matching_files(dir, is_results_file)?;
    info!(dir = %dir.display(), files = files.len(), "extracting run metrics");

    let mut all = Vec::new();
    for path in &files {
        match read_json::<RunSummary>(path) {
            Ok(summary) => {
                let metrics = run_metrics(&summary);
                if metrics.is_empty() {
                    warn!("no metrics found in {}", path.display());
                } else {
                    all.push(metrics);
                }
            }
            Err(e) => warn!("skipping {}: {e}", path.display()),
        }
    }

    if all.is_empty() {
        warn!(dir = %dir.display(), "no run metrics extracted");
        return Ok(None);
    }
    let averaged = average(&all);
    write_json(&dir.join(AVERAGE_RUN_METRICS), &averaged)?;
    Ok(Some(averaged))
}

#[derive(Deserialize, Debug)]
struct MetricDump {
    #[serde(rename = "Datapoints", default)]
    datapoints: Vec<Datapoint>,
}

#[derive(Deserialize, Debug)]
struct Datapoint {
    #[serde(rename = "Maximum")]
    maximum: Option<f64>,
}

/// Highest per-period maximum in one metric dump.
pub fn peak_maximum(raw: &[u8]) -> Result<Option<f64>> {
    let dump: MetricDump = serde_json::from_slice(raw)?;
    Ok(dump
        .datapoints
        .iter()
        .filter_map(|d| d.maximum)
        .reduce(f64::max))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContainerMetricAverage {
    pub average_maximum: f64,
    pub total_files_processed: usize,
    pub unit: String,
}

fn unit(metric: ContainerMetric) -> &'static str {
    match metric {
        ContainerMetric::Cpu | ContainerMetric::Memory => "Percent",
        ContainerMetric::NetworkRxBytes | ContainerMetric::NetworkTxBytes => "Bytes",
    }
}

/// Utilisation keeps the highest run peak, traffic the mean of run peaks.
fn combine_peaks(metric: ContainerMetric, peaks: &[f64]) -> f64 {
    match metric {
        ContainerMetric::Cpu | ContainerMetric::Memory => {
            peaks.iter().copied().fold(f64::MIN, f64::max)
        }
        ContainerMetric::NetworkRxBytes | ContainerMetric::NetworkTxBytes => {
            peaks.iter().sum::<f64>() / peaks.len() as f64
        }
    }
}

/// Aggregate container metric dumps in one service directory and write
/// [`AVERAGE_CONTAINER_METRICS`] there. Runs without a positive peak are ignored.
pub fn process_service(dir: &Path) -> Result<BTreeMap<String, ContainerMetricAverage>> {
    let mut report = BTreeMap::new();
    for metric in ContainerMetric::ALL {
        let suffix = metric.file_suffix();
        let files = matching_files(dir, |name| name.ends_with(&suffix))?;

        let mut peaks = Vec::new();
        for path in &files {
            let parsed = fs::read(path)
                .map_err(|e| Error::io(path, e))
                .and_then(|raw| peak_maximum(&raw));
            match parsed {
                Ok(Some(v)) if v > 0.0 => peaks.push(v),
                Ok(_) => warn!("no maximum values in {}", path.display()),
                Err(e) => warn!("skipping {}: {e}", path.display()),
            }
        }

        if !peaks.is_empty() {
            report.insert(
                metric.key().to_string(),
                ContainerMetricAverage {
                    average_maximum: combine_peaks(metric, &peaks),
                    total_files_processed: peaks.len(),
                    unit: unit(metric).to_string(),
                },
            );
        }
    }

    if report.is_empty() {
        warn!(dir = %dir.display(), "no container metrics extracted");
    } else {
        write_json(&dir.join(AVERAGE_CONTAINER_METRICS), &report)?;
    }
    Ok(report)
}

#[derive(Deserialize, Debug)]
struct LogDump {
    events: Vec<LogEvent>,
}

#[derive(Deserialize, Debug)]
struct LogEvent {
    #[serde(default)]
    message: String,
}

/// Per-operation latency statistics, keyed by operation name.
pub type LogMetrics = BTreeMap<String, BTreeMap<String, f64>>;

/// Parse `"id","protocol","operation","endpoint","timestamp","latency"`.
fn parse_log_line(message: &str) -> std::result::Result<(String, f64), String> {
    let parts: Vec<&str> = message.split(',').map(|p| p.trim().trim_matches('"')).collect();
    if parts.len() < 6 {
        return Err(format!("malformed log line: {message}"));
    }
    let latency = parts[5]
        .parse::<f64>()
        .map_err(|_| format!("invalid latency value: {}", parts[5]))?;
    Ok((parts[2].to_lowercase(), latency))
}

fn latency_stats(samples: &[f64]) -> BTreeMap<String, f64> {
    let trend = trend(samples);
    let mut stats = BTreeMap::new();
    stats.insert("total_requests".to_string(), samples.len() as f64);
    for (key, suffix) in DURATION_STATS {
        if let Some(value) = trend.get(key) {
            stats.insert(format!("latency_{suffix}"), *value);
        }
    }
    stats
}

/// Latency statistics per operation from one log dump.
pub fn log_metrics(raw: &[u8]) -> Result<LogMetrics> {
    let dump: LogDump = serde_json::from_slice(raw)?;
    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for event in &dump.events {
        if event.message.is_empty() {
            continue;
        }
        match parse_log_line(&event.message) {
            Ok((_, latency)) if latency > MAX_LOG_LATENCY => {
                warn!("skipping outlier latency {latency}");
            }
            Ok((operation, latency)) => {
                if LOG_OPERATIONS.contains(&operation.as_str()) {
                    samples.entry(operation).or_default().push(latency);
                }
            }
            Err(reason) => warn!("{reason}"),
        }
    }
    Ok(samples
        .into_iter()
        .map(|(operation, values)| (operation, latency_stats(&values)))
        .collect())
}

/// Average the per-run log statistics of one service and write
/// [`SERVICE_LOG_METRICS`] into its directory.
pub fn process_logs(dir: &Path, service: &str) -> Result<Option<LogMetrics>> {
    let suffix = format!("_{service}{LOGS_SUFFIX}");
    let files = matching_files(dir, |name| name.starts_with("run_") && name.ends_with(&suffix))?;

    let mut per_operation: BTreeMap<String, Vec<BTreeMap<String, f64>>> = BTreeMap::new();
    for path in &files {
        let parsed = fs::read(path)
            .map_err(|e| Error::io(path, e))
            .and_then(|raw| log_metrics(&raw));
        match parsed {
            Ok(metrics) if metrics.is_empty() => {
                warn!("no valid latency data in {}", path.display());
            }
            Ok(metrics) => {
                for (operation, stats) in metrics {
                    per_operation.entry(operation).or_default().push(stats);
                }
            }
            Err(e) => warn!("skipping {}: {e}", path.display()),
        }
    }

    if per_operation.is_empty() {
        return Ok(None);
    }
    let averaged: LogMetrics = per_operation
        .into_iter()
        .map(|(operation, runs)| (operation, average(&runs)))
        .collect();
    write_json(&dir.join(SERVICE_LOG_METRICS), &averaged)?;
    Ok(Some(averaged))
}

/// Run every extraction for one test directory. Missing service directories
/// are reported and skipped. Log statistics of all services are also
/// collected into [`AVERAGE_LOG_METRICS`].
pub fn process_test_dir(dir: &Path, services: &[String]) -> Result<()> {
    process_results(dir)?;
    let mut logs = BTreeMap::new();
    for service in services {
        let service_dir = dir.join(service);
        if !service_dir.is_dir() {
            warn!("service directory not found: {}", service_dir.display());
            continue;
        }
        if let Err(e) = process_service(&service_dir) {
            warn!("{service} extraction failed: {e}");
        }
        match process_logs(&service_dir, service) {
            Ok(Some(metrics)) => {
                logs.insert(service.clone(), metrics);
            }
            Ok(None) => warn!("no log metrics extracted for {service}"),
            Err(e) => warn!("{service} log extraction failed: {e}"),
        }
    }
    if !logs.is_empty() {
        write_json(&dir.join(AVERAGE_LOG_METRICS), &logs)?;
    }
    Ok(())
}

/// Test directories under `root` (`{protocol}:{test_type}`), sorted.
pub fn test_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root).map_err(|e| Error::io(root, e))?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.contains(':'))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Extract every test directory under `root`. A `root` without test
/// directories is treated as a single test directory. Returns how many
/// directories were processed.
pub fn process_all(root: &Path, services: &[String]) -> Result<usize> {
    let dirs = test_dirs(root)?;
    if dirs.is_empty() {
        process_test_dir(root, services)?;
        return Ok(1);
    }
    for dir in &dirs {
        info!(dir = %dir.display(), "processing test directory");
        if let Err(e) = process_test_dir(dir, services) {
            warn!("extraction failed for {}: {e}", dir.display());
        }
    }
    Ok(dirs.len())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn http_summary(p95: f64, checks_rate: f64) -> serde_json::Value {
        json!({
            "metrics": {
                "http_req_duration": {
                    "type": "trend",
                    "values": {"avg": 10.0, "med": 9.0, "p(95)": p95}
                },
                "http_reqs": {"type": "counter", "values": {"count": 100.0, "rate": 10.0}},
                "checks": {
                    "type": "rate",
                    "values": {"rate": checks_rate, "passes": 95.0, "fails": 5.0}
                },
                "vus_max": {"type": "gauge", "values": {"value": 50.0}},
                "data_sent": {"type": "counter", "values": {"count": 2048.0, "rate": 204.8}}
            }
        })
    }

    #[test]
    fn flattens_http_summary() {
        let summary: RunSummary = serde_json::from_value(http_summary(30.0, 0.95)).unwrap();
        let metrics = run_metrics(&summary);
        assert_eq!(metrics["request_duration_p95"], 30.0);
        assert_eq!(metrics["request_duration_median"], 9.0);
        assert_eq!(metrics["request_duration_p99"], 0.0);
        assert_eq!(metrics["throughput_total_requests"], 100.0);
        assert_eq!(metrics["success_rate_rate"], 0.95);
        assert_eq!(metrics["vus_max"], 50.0);
        assert_eq!(metrics["data_sent_count"], 2048.0);
        assert!(!metrics.contains_key("data_received_count"));
    }

    #[test]
    fn grpc_summary_uses_iterations_for_throughput() {
        let raw = json!({
            "metrics": {
                "grpc_req_duration": {"values": {"avg": 4.0, "p(95)": 8.0}},
                "iterations": {"values": {"count": 40.0, "rate": 4.0}}
            }
        });
        let summary: RunSummary = serde_json::from_value(raw).unwrap();
        let metrics = run_metrics(&summary);
        assert_eq!(metrics["request_duration_p95"], 8.0);
        assert_eq!(metrics["throughput_requests_per_second"], 4.0);
    }

    #[test]
    fn averages_only_over_files_with_the_key() {
        let a = BTreeMap::from([("x".to_string(), 2.0), ("y".to_string(), 10.0)]);
        let b = BTreeMap::from([("x".to_string(), 4.0)]);
        let avg = average(&[a, b]);
        assert_eq!(avg["x"], 3.0);
        assert_eq!(avg["y"], 10.0);
    }

    #[test]
    fn processes_results_directory_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, body: String| fs::write(dir.path().join(name), body).unwrap();
        write("results_http:smoke_run_1.json", http_summary(20.0, 1.0).to_string());
        write("results_http:smoke_run_2.json", http_summary(40.0, 0.9).to_string());
        write("results_http:smoke_run_3.json", "{truncated".to_string());
        write("timing_http:smoke_run_1.json", "{}".to_string());

        let averaged = process_results(dir.path()).unwrap().unwrap();
        assert_eq!(averaged["request_duration_p95"], 30.0);
        assert_eq!(averaged["success_rate_rate"], 0.95);
        assert!(dir.path().join(AVERAGE_RUN_METRICS).exists());
    }

    #[test]
    fn empty_results_directory_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(process_results(dir.path()).unwrap(), None);
        assert!(!dir.path().join(AVERAGE_RUN_METRICS).exists());
    }

    #[test]
    fn peak_maximum_ignores_missing_values() {
        let raw = json!({"Datapoints": [{"Maximum": 40.0}, {"Average": 90.0}, {"Maximum": 60.0}]});
        assert_eq!(peak_maximum(raw.to_string().as_bytes()).unwrap(), Some(60.0));
        assert_eq!(peak_maximum(b"{\"Datapoints\": []}").unwrap(), None);
        assert!(peak_maximum(b"not json").is_err());
    }

    fn write_dump(dir: &Path, name: &str, maxima: &[f64]) {
        let points: Vec<_> = maxima.iter().map(|v| json!({"Maximum": v})).collect();
        fs::write(dir.join(name), json!({"Datapoints": points}).to_string()).unwrap();
    }

    #[test]
    fn processes_service_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_dump(dir.path(), "run_1_order_cpu_metrics.json", &[10.0, 30.0]);
        write_dump(dir.path(), "run_2_order_cpu_metrics.json", &[40.0]);
        write_dump(dir.path(), "run_1_order_network_tx_bytes_metrics.json", &[100.0, 300.0]);
        write_dump(dir.path(), "run_2_order_network_tx_bytes_metrics.json", &[500.0]);
        write_dump(dir.path(), "run_1_order_network_rx_bytes_metrics.json", &[0.0]);
        fs::write(dir.path().join("run_1_order_memory_metrics.json"), "oops").unwrap();

        let report = process_service(dir.path()).unwrap();
        let cpu = &report["cpu"];
        assert_eq!(cpu.average_maximum, 40.0);
        assert_eq!(cpu.total_files_processed, 2);
        assert_eq!(cpu.unit, "Percent");
        let tx = &report["network_tx_bytes"];
        assert_eq!(tx.average_maximum, 400.0);
        assert_eq!(tx.unit, "Bytes");
        assert!(!report.contains_key("memory"));
        assert!(!report.contains_key("network_rx_bytes"));
        assert!(dir.path().join(AVERAGE_CONTAINER_METRICS).exists());
    }

    fn log_line(operation: &str, latency: &str) -> serde_json::Value {
        json!({
            "message": format!(
                r#""req_1","http","{operation}","/order","2026-05-01T10:00:00Z","{latency}""#
            )
        })
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn log_lines_are_grouped_by_operation() {
        let raw = json!({"events": [
            log_line("serialize", "0.2"),
            log_line("Serialize", "0.4"),
            log_line("deserialize", "0.1"),
            log_line("serialize", "5.0"),
            log_line("validate", "0.3"),
            log_line("deserialize", "fast"),
            {"message": "garbage"},
            {"message": ""},
        ]});
        let metrics = log_metrics(raw.to_string().as_bytes()).unwrap();
        assert_eq!(metrics.len(), 2);
        let serialize = &metrics["serialize"];
        assert_eq!(serialize["total_requests"], 2.0);
        assert_eq!(serialize["latency_max"], 0.4);
        assert!(close(serialize["latency_avg"], 0.3));
        assert_eq!(metrics["deserialize"]["latency_p99"], 0.1);
        assert!(log_metrics(b"{\"Datapoints\": []}").is_err());
    }

    #[test]
    fn processes_service_logs_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, events: Vec<serde_json::Value>| {
            fs::write(dir.path().join(name), json!({ "events": events }).to_string()).unwrap()
        };
        write(
            "run_1_order_cloudwatch_logs.json",
            vec![
                log_line("serialize", "0.2"),
                log_line("serialize", "0.4"),
                log_line("serialize", "7.5"),
                log_line("deserialize", "0.1"),
                json!({"message": "not,enough"}),
            ],
        );
        write("run_2_order_cloudwatch_logs.json", vec![log_line("serialize", "0.6")]);
        fs::write(dir.path().join("run_3_order_cloudwatch_logs.json"), "{truncated").unwrap();

        let metrics = process_logs(dir.path(), "order").unwrap().unwrap();
        let serialize = &metrics["serialize"];
        assert_eq!(serialize["total_requests"], 1.5);
        assert!(close(serialize["latency_avg"], 0.45));
        assert!(close(serialize["latency_max"], 0.5));
        assert_eq!(metrics["deserialize"]["total_requests"], 1.0);

        let saved: LogMetrics =
            serde_json::from_slice(&fs::read(dir.path().join(SERVICE_LOG_METRICS)).unwrap())
                .unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(process_logs(dir.path(), "user").unwrap(), None);
    }

    #[test]
    fn walks_test_directories_under_root() {
        let root = tempfile::tempdir().unwrap();
        let test_dir = root.path().join("http:smoke");
        fs::create_dir_all(test_dir.join("order")).unwrap();
        fs::create_dir_all(root.path().join("scratch")).unwrap();
        fs::write(
            test_dir.join("results_http:smoke_run_1.json"),
            http_summary(25.0, 1.0).to_string(),
        )
        .unwrap();
        fs::write(
            test_dir.join("order").join("run_1_order_memory_metrics.json"),
            json!({"Datapoints": [{"Maximum": 12.5}]}).to_string(),
        )
        .unwrap();

        let services = vec!["order".to_string(), "user".to_string()];
        assert_eq!(process_all(root.path(), &services).unwrap(), 1);
        assert!(test_dir.join(AVERAGE_RUN_METRICS).exists());
        let report: BTreeMap<String, ContainerMetricAverage> = serde_json::from_slice(
            &fs::read(test_dir.join("order").join(AVERAGE_CONTAINER_METRICS)).unwrap(),
        )
        .unwrap();
        assert_eq!(report["memory"].average_maximum, 12.5);
        assert!(!root.path().join("scratch").join(AVERAGE_RUN_METRICS).exists());
    }
}
