use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod driver;
mod error;
mod extract;
mod orchestrate;
mod payload;
mod proto;
mod scenario;
mod thresholds;
mod types;

use crate::config::{Config, Protocol};
use crate::driver::record::{summarize, RunContext};
use crate::driver::runner::{run, RunPlan};
use crate::driver::{GrpcDriver, HttpDriver, OrderDriver};
use crate::orchestrate::{Monitoring, Plan, DEFAULT_SERVICES};
use crate::payload::OrderGenerator;
use crate::scenario::{parse_duration, TestType};
use crate::thresholds::ThresholdSet;
use crate::types::RunSummary;

/// Exit status when the run completed but a threshold failed.
const THRESHOLDS_FAILED: i32 = 99;

#[derive(Parser)]
#[command(name = "order-loadtest")]
#[command(about = "Load test tooling for the order service over HTTP and gRPC")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the load engine options for a test type
    Options {
        /// Falls back to TEST_TYPE, then smoke
        #[arg(long)]
        test_type: Option<String>,

        #[arg(long, value_enum, default_value_t = Protocol::Http)]
        protocol: Protocol,
    },

    /// Print generated order requests
    Payload {
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value = "1")]
        count: usize,
    },

    /// Drive the order service at fixed concurrency and print a result summary
    Run {
        #[arg(long, value_enum, default_value_t = Protocol::Http)]
        protocol: Protocol,

        /// Falls back to TEST_TYPE, then smoke
        #[arg(long)]
        test_type: Option<String>,

        /// Defaults to the scenario's starting virtual users
        #[arg(long)]
        vus: Option<u32>,

        /// Defaults to the scenario's total duration unless --iterations is set
        #[arg(long, value_parser = parse_duration)]
        duration: Option<Duration>,

        /// Iterations per virtual user
        #[arg(long)]
        iterations: Option<u64>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        http_port: Option<u16>,

        #[arg(long)]
        grpc_port: Option<u16>,

        /// Delay after each iteration, in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Falls back to RESULTS_PATH
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run the load command serially for every protocol, test type and run
    Orchestrate {
        #[arg(long, value_enum, value_delimiter = ',', default_value = "http,grpc")]
        protocols: Vec<Protocol>,

        /// Defaults to every test type
        #[arg(long, value_delimiter = ',')]
        test_types: Vec<String>,

        #[arg(long, default_value = "5")]
        runs: u32,

        #[arg(long, value_parser = parse_duration, default_value = "60s")]
        cooldown: Duration,

        #[arg(long, default_value = "test-results")]
        output_dir: PathBuf,

        #[arg(long, value_delimiter = ',')]
        services: Vec<String>,

        /// Container cluster to pull logs and metrics for; skipped when unset
        #[arg(long)]
        cluster: Option<String>,

        #[arg(long)]
        region: Option<String>,

        /// Load command; `{protocol}` and `{test_type}` are substituted
        #[arg(last = true, required = true)]
        load_command: Vec<String>,
    },

    /// Average result summaries and container metrics per test directory
    Extract {
        #[arg(long, default_value = "test-results")]
        dir: PathBuf,

        #[arg(long, value_delimiter = ',')]
        services: Vec<String>,
    },
}

fn services_or_default(services: Vec<String>) -> Vec<String> {
    if services.is_empty() {
        DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect()
    } else {
        services
    }
}

/// Print the summary and, when a path is given, save the same JSON there.
fn emit_summary(
    summary: &RunSummary,
    output_path: Option<&Path>,
    mut out: impl Write,
) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(summary)?;
    if let Some(path) = output_path {
        fs::write(path, &rendered)?;
        info!("results saved to: {}", path.display());
    }
    writeln!(out, "{rendered}")?;
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("order_loadtest=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Options {
            test_type,
            protocol,
        } => {
            let name = test_type.or(config.test_type);
            let scenario = TestType::resolve(name.as_deref()).scenario();
            let thresholds = ThresholdSet::resolve(name.as_deref()).view(protocol);
            let options = json!({
                "scenarios": { scenario.name.as_str(): scenario.to_options() },
                "thresholds": thresholds.to_options(),
            });
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
        Commands::Payload { seed, count } => {
            let mut generator = OrderGenerator::seeded(seed.unwrap_or_else(rand::random));
            let orders: Vec<_> = (0..count).map(|_| generator.generate()).collect();
            println!("{}", serde_json::to_string_pretty(&orders)?);
        }
        Commands::Run {
            protocol,
            test_type,
            vus,
            duration,
            iterations,
            seed,
            host,
            http_port,
            grpc_port,
            pacing_ms,
            output,
        } => {
            let mut config = config;
            if let Some(host) = host {
                config.target_host = host;
            }
            if let Some(port) = http_port {
                config.http_port = port;
            }
            if let Some(port) = grpc_port {
                config.grpc_port = port;
            }
            if let Some(ms) = pacing_ms {
                config.pacing_ms = ms;
            }

            let test_type = TestType::resolve(test_type.or(config.test_type.clone()).as_deref());
            let scenario = test_type.scenario();
            let target = config.target();
            let driver: Arc<dyn OrderDriver> = match protocol {
                Protocol::Http => Arc::new(HttpDriver::new(target.order_url())?),
                Protocol::Grpc => Arc::new(GrpcDriver::connect_lazy(&target.grpc_endpoint())?),
            };

            let plan = RunPlan {
                vus: vus.unwrap_or_else(|| scenario.executor.initial_vus()).max(1),
                duration: match (duration, iterations) {
                    (None, None) => Some(scenario.executor.total_duration()),
                    (duration, _) => duration,
                },
                iterations_per_vu: iterations,
                pacing: config.pacing(),
                seed: seed.unwrap_or_else(rand::random),
            };

            info!(
                test_type = %test_type,
                protocol = %protocol,
                host = %target.host,
                vus = plan.vus,
                scenario_peak_vus = scenario.executor.peak_vus(),
                "starting run"
            );

            let started = Instant::now();
            let outcomes = run(driver, &plan).await;
            let thresholds = ThresholdSet::for_test_type(test_type).view(protocol);
            let summary = summarize(
                &RunContext {
                    test_type,
                    protocol,
                    vus: plan.vus,
                    elapsed: started.elapsed(),
                    thresholds: &thresholds,
                },
                &outcomes,
            );

            let output_path = output.or(config.results_path);
            emit_summary(&summary, output_path.as_deref(), std::io::stdout().lock())?;

            if !summary.thresholds_ok() {
                for failed in summary.failed_thresholds() {
                    warn!("threshold crossed: {failed}");
                }
                exit(THRESHOLDS_FAILED);
            }
        }
        Commands::Orchestrate {
            protocols,
            test_types,
            runs,
            cooldown,
            output_dir,
            services,
            cluster,
            region,
            load_command,
        } => {
            let test_types = if test_types.is_empty() {
                TestType::ALL.to_vec()
            } else {
                test_types
                    .iter()
                    .map(|name| TestType::resolve(Some(name.as_str())))
                    .collect()
            };
            let monitoring = cluster.map(|cluster| Monitoring {
                region,
                ..Monitoring::new(cluster)
            });
            let plan = Plan {
                protocols,
                test_types,
                runs,
                cooldown,
                output_dir,
                load_command,
                services: services_or_default(services),
                monitoring,
            };

            let records = orchestrate::execute(&plan).await?;
            info!(runs = records.len(), dir = %plan.output_dir.display(), "all runs finished");
        }
        Commands::Extract { dir, services } => {
            let processed = extract::process_all(&dir, &services_or_default(services))?;
            info!(directories = processed, "extraction finished");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_goes_to_stdout_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = RunSummary {
            test_type: Some("smoke".to_string()),
            ..Default::default()
        };

        let mut stdout = Vec::new();
        emit_summary(&summary, Some(&path), &mut stdout).unwrap();

        let printed: RunSummary = serde_json::from_slice(&stdout).unwrap();
        let saved: RunSummary = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(printed, summary);
        assert_eq!(saved, summary);
    }

    #[test]
    fn summary_without_path_is_only_printed() {
        let mut stdout = Vec::new();
        emit_summary(&RunSummary::default(), None, &mut stdout).unwrap();
        assert!(String::from_utf8(stdout).unwrap().trim_end().ends_with('}'));
    }
}
