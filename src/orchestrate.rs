//! Serial test sequencing with monitoring downloads between runs.
//!
//! Layout under the output directory:
//!
//! ```text
//! {protocol}:{test_type}/
//!     results_{protocol}:{test_type}_run_{n}.json
//!     timing_{protocol}:{test_type}_run_{n}.json
//!     {service}/run_{n}_{service}_cloudwatch_logs.json
//!     {service}/run_{n}_{service}_{metric}_metrics.json
//! ```
//!
//! Nothing here aborts the sequence: a failing load command or cloud CLI call
//! is logged and the next step runs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::Protocol;
use crate::error::{Error, Result};
use crate::scenario::TestType;
use crate::types::TimingRecord;

pub const LOGS_SUFFIX: &str = "_cloudwatch_logs.json";

pub const DEFAULT_SERVICES: [&str; 4] = ["order", "product", "user", "payment"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerMetric {
    Cpu,
    Memory,
    NetworkRxBytes,
    NetworkTxBytes,
}

impl ContainerMetric {
    pub const ALL: [ContainerMetric; 4] = [
        ContainerMetric::Cpu,
        ContainerMetric::Memory,
        ContainerMetric::NetworkRxBytes,
        ContainerMetric::NetworkTxBytes,
    ];

    /// Short name used in file names and extracted reports.
    pub fn key(&self) -> &'static str {
        match self {
            ContainerMetric::Cpu => "cpu",
            ContainerMetric::Memory => "memory",
            ContainerMetric::NetworkRxBytes => "network_rx_bytes",
            ContainerMetric::NetworkTxBytes => "network_tx_bytes",
        }
    }

    pub fn cloudwatch_name(&self) -> &'static str {
        match self {
            ContainerMetric::Cpu => "CpuUtilized",
            ContainerMetric::Memory => "MemoryUtilized",
            ContainerMetric::NetworkRxBytes => "NetworkRxBytes",
            ContainerMetric::NetworkTxBytes => "NetworkTxBytes",
        }
    }

    pub fn file_suffix(&self) -> String {
        format!("_{}_metrics.json", self.key())
    }
}

#[derive(Debug, Clone)]
pub struct Monitoring {
    pub cli: String,
    pub cluster: String,
    pub log_group_prefix: String,
    pub namespace: String,
    pub region: Option<String>,
    pub period_secs: u32,
}

impl Monitoring {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cli: "aws".to_string(),
            cluster: cluster.into(),
            log_group_prefix: "/ecs/".to_string(),
            namespace: "ECS/ContainerInsights".to_string(),
            region: None,
            period_secs: 60,
        }
    }

    pub fn logs_args(&self, service: &str, window: &Window) -> Vec<String> {
        let mut args = vec![
            "logs".to_string(),
            "filter-log-events".to_string(),
            "--log-group-name".to_string(),
            format!("{}{}", self.log_group_prefix, service),
            "--start-time".to_string(),
            window.start.timestamp_millis().to_string(),
            "--end-time".to_string(),
            window.end.timestamp_millis().to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        self.push_region(&mut args);
        args
    }

    pub fn metric_args(
        &self,
        service: &str,
        metric: ContainerMetric,
        window: &Window,
    ) -> Vec<String> {
        let mut args = vec![
            "cloudwatch".to_string(),
            "get-metric-statistics".to_string(),
            "--namespace".to_string(),
            self.namespace.clone(),
            "--metric-name".to_string(),
            metric.cloudwatch_name().to_string(),
            "--dimensions".to_string(),
            format!("Name=ClusterName,Value={}", self.cluster),
            format!("Name=ServiceName,Value={service}"),
            "--start-time".to_string(),
            window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "--end-time".to_string(),
            window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            "--period".to_string(),
            self.period_secs.to_string(),
            "--statistics".to_string(),
            "Maximum".to_string(),
            "Average".to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        self.push_region(&mut args);
        args
    }

    fn push_region(&self, args: &mut Vec<String>) {
        if let Some(region) = &self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
    }
}

/// Wall-clock bounds of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn timing_record(&self, test_name: &str, run_number: u32) -> TimingRecord {
        TimingRecord {
            test_name: test_name.to_string(),
            run_number,
            start_time: self.start.to_rfc3339(),
            end_time: self.end.to_rfc3339(),
            start_timestamp: self.start.timestamp(),
            end_timestamp: self.end.timestamp(),
            duration_seconds: (self.end - self.start).num_seconds(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub protocols: Vec<Protocol>,
    pub test_types: Vec<TestType>,
    pub runs: u32,
    pub cooldown: Duration,
    pub output_dir: PathBuf,
    /// Program and arguments of the load command. `{protocol}` and
    /// `{test_type}` are substituted in every argument.
    pub load_command: Vec<String>,
    pub services: Vec<String>,
    pub monitoring: Option<Monitoring>,
}

pub fn test_name(protocol: Protocol, test_type: TestType) -> String {
    format!("{protocol}:{test_type}")
}

pub fn results_file(dir: &Path, test_name: &str, run: u32) -> PathBuf {
    dir.join(format!("results_{test_name}_run_{run}.json"))
}

pub fn timing_file(dir: &Path, test_name: &str, run: u32) -> PathBuf {
    dir.join(format!("timing_{test_name}_run_{run}.json"))
}

fn substitute(arg: &str, protocol: Protocol, test_type: TestType) -> String {
    arg.replace("{protocol}", protocol.as_str())
        .replace("{test_type}", test_type.as_str())
}

fn describe(program: &str, args: &[String]) -> String {
    format!("{program} {}", args.join(" "))
}

/// Run the load command with the terminal's stdio so its progress stays visible.
async fn run_load_command(program: &str, args: &[String], envs: &[(&str, String)]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .envs(envs.iter().map(|(k, v)| (*k, v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| Error::Command {
            command: describe(program, args),
            reason: e.to_string(),
        })?;
    if !status.success() {
        return Err(Error::Command {
            command: describe(program, args),
            reason: status.to_string(),
        });
    }
    Ok(())
}

/// Run a command and capture its stdout.
async fn capture_command(program: &str, args: &[String]) -> Result<Vec<u8>> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::Command {
            command: describe(program, args),
            reason: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(Error::Command {
            command: describe(program, args),
            reason: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output.stdout)
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| Error::io(path, e))
}

async fn download_monitoring(
    monitoring: &Monitoring,
    services: &[String],
    dir: &Path,
    run: u32,
    window: &Window,
) {
    for service in services {
        let service_dir = dir.join(service);

        let logs_path = service_dir.join(format!("run_{run}_{service}{LOGS_SUFFIX}"));
        match capture_command(&monitoring.cli, &monitoring.logs_args(service, window)).await {
            Ok(stdout) => {
                if let Err(e) = write_file(&logs_path, &stdout).await {
                    warn!("failed to save logs for {service}: {e}");
                }
            }
            Err(e) => warn!("failed to download logs for {service}: {e}"),
        }

        for metric in ContainerMetric::ALL {
            let path = service_dir.join(format!("run_{run}_{service}{}", metric.file_suffix()));
            let args = monitoring.metric_args(service, metric, window);
            match capture_command(&monitoring.cli, &args).await {
                Ok(stdout) => {
                    if let Err(e) = write_file(&path, &stdout).await {
                        warn!("failed to save {} metrics for {service}: {e}", metric.key());
                    }
                }
                Err(e) => warn!("failed to download {} metrics for {service}: {e}", metric.key()),
            }
        }
    }
}

/// Execute every protocol × test type × run serially. Returns the timing
/// record of each run in execution order.
pub async fn execute(plan: &Plan) -> Result<Vec<TimingRecord>> {
    let Some((program, template)) = plan.load_command.split_first() else {
        return Err(Error::Command {
            command: String::new(),
            reason: "no load command configured".to_string(),
        });
    };

    let total = plan.protocols.len() * plan.test_types.len() * plan.runs as usize;
    let mut records = Vec::with_capacity(total);
    let mut completed = 0;

    for &protocol in &plan.protocols {
        for &test_type in &plan.test_types {
            let name = test_name(protocol, test_type);
            let dir = plan.output_dir.join(&name);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| Error::io(&dir, e))?;

            for run in 1..=plan.runs {
                let results_path = results_file(&dir, &name, run);
                let args: Vec<String> = template
                    .iter()
                    .map(|a| substitute(a, protocol, test_type))
                    .collect();
                let envs = [
                    ("TEST_TYPE", test_type.as_str().to_string()),
                    ("RESULTS_PATH", results_path.display().to_string()),
                    ("PROTOCOL", protocol.as_str().to_string()),
                ];

                info!(test = %name, run, "starting load run");
                let start = Utc::now();
                if let Err(e) = run_load_command(program, &args, &envs).await {
                    warn!(test = %name, run, "load command failed: {e}");
                }
                let window = Window {
                    start,
                    end: Utc::now(),
                };

                let record = window.timing_record(&name, run);
                info!(
                    test = %name,
                    run,
                    duration_seconds = record.duration_seconds,
                    "load run finished"
                );
                let timing_path = timing_file(&dir, &name, run);
                write_file(&timing_path, &serde_json::to_vec_pretty(&record)?).await?;
                records.push(record);

                if let Some(monitoring) = &plan.monitoring {
                    download_monitoring(monitoring, &plan.services, &dir, run, &window).await;
                }

                completed += 1;
                if completed < total && !plan.cooldown.is_zero() {
                    info!(cooldown = ?plan.cooldown, "cooling down");
                    tokio::time::sleep(plan.cooldown).await;
                }
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn window() -> Window {
        Window {
            start: Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 5, 1, 10, 6, 30).unwrap(),
        }
    }

    #[test]
    fn timing_record_fields() {
        let record = window().timing_record("http:average_load", 2);
        assert_eq!(record.test_name, "http:average_load");
        assert_eq!(record.run_number, 2);
        assert_eq!(record.duration_seconds, 390);
        assert_eq!(record.end_timestamp - record.start_timestamp, 390);
        assert_eq!(record.start_time, "2026-05-01T10:00:00+00:00");
    }

    #[test]
    fn monitoring_arguments() {
        let mut monitoring = Monitoring::new("perf-cluster");
        monitoring.region = Some("eu-west-1".to_string());

        let logs = monitoring.logs_args("order", &window());
        assert_eq!(logs[3], "/ecs/order");
        assert_eq!(logs[5], window().start.timestamp_millis().to_string());
        assert_eq!(&logs[logs.len() - 2..], ["--region", "eu-west-1"]);

        let cpu = monitoring.metric_args("payment", ContainerMetric::Cpu, &window());
        assert!(cpu.contains(&"CpuUtilized".to_string()));
        assert!(cpu.contains(&"Name=ServiceName,Value=payment".to_string()));
        assert!(cpu.contains(&"Name=ClusterName,Value=perf-cluster".to_string()));
        assert!(cpu.contains(&"2026-05-01T10:06:30Z".to_string()));
    }

    #[test]
    fn naming() {
        let name = test_name(Protocol::Grpc, TestType::Spike);
        assert_eq!(name, "grpc:spike");
        assert_eq!(
            results_file(Path::new("out"), &name, 3),
            PathBuf::from("out/results_grpc:spike_run_3.json")
        );
        assert_eq!(
            substitute("scripts/{protocol}-{test_type}.js", Protocol::Http, TestType::Soak),
            "scripts/http-soak.js"
        );
    }

    #[tokio::test]
    async fn runs_serially_and_survives_failing_commands() {
        let out = tempfile::tempdir().unwrap();
        let mut monitoring = Monitoring::new("cluster");
        monitoring.cli = "definitely-not-an-installed-cli".to_string();

        let plan = Plan {
            protocols: vec![Protocol::Http, Protocol::Grpc],
            test_types: vec![TestType::Smoke],
            runs: 2,
            cooldown: Duration::ZERO,
            output_dir: out.path().to_path_buf(),
            load_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo '{\"test\":\"{test_type}\"}' > \"$RESULTS_PATH\"".to_string(),
            ],
            services: vec!["order".to_string()],
            monitoring: Some(monitoring),
        };

        let records = execute(&plan).await.unwrap();
        let names: Vec<(&str, u32)> = records
            .iter()
            .map(|r| (r.test_name.as_str(), r.run_number))
            .collect();
        assert_eq!(
            names,
            vec![("http:smoke", 1), ("http:smoke", 2), ("grpc:smoke", 1), ("grpc:smoke", 2)]
        );

        let dir = out.path().join("grpc:smoke");
        let results = std::fs::read_to_string(results_file(&dir, "grpc:smoke", 2)).unwrap();
        assert!(results.contains("smoke"));
        let timing: TimingRecord = serde_json::from_slice(
            &std::fs::read(timing_file(&dir, "grpc:smoke", 1)).unwrap(),
        )
        .unwrap();
        assert_eq!(timing.run_number, 1);
        assert!(!dir.join("order").join("run_1_order_cpu_metrics.json").exists());
    }

    #[tokio::test]
    async fn empty_load_command_is_rejected() {
        let plan = Plan {
            protocols: vec![Protocol::Http],
            test_types: vec![TestType::Smoke],
            runs: 1,
            cooldown: Duration::ZERO,
            output_dir: PathBuf::from("unused"),
            load_command: vec![],
            services: vec![],
            monitoring: None,
        };
        assert!(execute(&plan).await.is_err());
    }

    #[tokio::test]
    async fn load_command_exit_status_is_reported() {
        let args = vec!["-c".to_string(), "echo progress; exit 3".to_string()];
        let err = run_load_command("sh", &args, &[]).await.unwrap_err();
        assert!(matches!(err, Error::Command { ref reason, .. } if reason.contains('3')));
        assert!(run_load_command("sh", &["-c".to_string(), "true".to_string()], &[])
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn printing_and_failing_load_command_does_not_stop_the_sequence() {
        let out = tempfile::tempdir().unwrap();
        let plan = Plan {
            protocols: vec![Protocol::Http],
            test_types: vec![TestType::Smoke, TestType::Stress],
            runs: 2,
            cooldown: Duration::ZERO,
            output_dir: out.path().to_path_buf(),
            load_command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo running {test_type}; exit 1".to_string(),
            ],
            services: vec![],
            monitoring: None,
        };

        let records = execute(&plan).await.unwrap();
        assert_eq!(records.len(), 4);
        let dir = out.path().join("http:stress");
        assert!(timing_file(&dir, "http:stress", 2).exists());
        assert!(!results_file(&dir, "http:stress", 2).exists());
    }
}
