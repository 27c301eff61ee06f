use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Settings read from the process environment.
///
/// `TEST_TYPE` and `RESULTS_PATH` mirror the variables the external load tool
/// passes to its scripts, so the same shell wrappers drive both.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub results_path: Option<PathBuf>,
    #[serde(default = "default_host")]
    pub target_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_grpc_port() -> u16 {
    50051
}

fn default_pacing_ms() -> u64 {
    1000
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(envy::from_env::<Config>()?)
    }

    pub fn target(&self) -> Target {
        Target {
            host: self.target_host.clone(),
            http_port: self.http_port,
            grpc_port: self.grpc_port,
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Protocol {
    Http,
    Grpc,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Grpc => "grpc",
        }
    }

    /// Name of the per-request latency metric for this protocol.
    pub fn request_duration_metric(&self) -> &'static str {
        match self {
            Protocol::Http => "http_req_duration",
            Protocol::Grpc => "grpc_req_duration",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared address record for both protocol flavours of the order service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,
}

impl Target {
    pub fn order_url(&self) -> String {
        format!("http://{}:{}/order", self.host, self.http_port)
    }

    pub fn grpc_endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.grpc_port)
    }
}
