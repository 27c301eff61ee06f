//! Test drivers: submit one generated order per iteration and validate the reply.
//!
//! An iteration never fails the run. Transport problems and failed checks are
//! both folded into the [`IterationOutcome`] and counted later.

pub mod grpc;
pub mod http;
pub mod record;
pub mod runner;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::Protocol;
use crate::payload::{CreateOrderRequest, OrderGenerator};

pub use self::grpc::GrpcDriver;
pub use self::http::HttpDriver;

/// Per-request timeout. Large enough that the driver never gives up before the
/// scenario's own duration budget runs out.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

pub const CHECK_STATUS: &str = "status is ok";
pub const CHECK_SUCCESS_FLAG: &str = "has success flag";
pub const CHECK_ORDER: &str = "has order";
pub const CHECK_NO_ERRORS: &str = "has no errors";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Connection,
    FailedCheck,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub passed: bool,
}

impl Check {
    pub fn new(name: &'static str, passed: bool) -> Self {
        Self { name, passed }
    }
}

/// A completed request/response exchange, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub latency: Duration,
    pub checks: Vec<Check>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl Exchange {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub latency: Duration,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterationOutcome {
    pub duration: Duration,
    pub result: Result<Exchange, Failure>,
}

impl IterationOutcome {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.result {
            Ok(exchange) if exchange.passed() => None,
            Ok(_) => Some(FailureKind::FailedCheck),
            Err(failure) => Some(failure.kind),
        }
    }
}

#[async_trait]
pub trait OrderDriver: Send + Sync {
    fn protocol(&self) -> Protocol;

    async fn submit(&self, request: &CreateOrderRequest) -> Result<Exchange, Failure>;
}

/// Build a payload, submit it, and validate the response.
pub async fn iterate<D, R>(driver: &D, generator: &mut OrderGenerator<R>) -> IterationOutcome
where
    D: OrderDriver + ?Sized,
    R: Rng,
{
    let start = Instant::now();
    let request = generator.generate();
    let result = driver.submit(&request).await;
    if let Err(failure) = &result {
        debug!(
            request_id = %request.request_id,
            kind = ?failure.kind,
            "request failed: {}",
            failure.message
        );
    }
    IterationOutcome {
        duration: start.elapsed(),
        result,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    /// Driver that fails every `fail_every`-th request with a connection error.
    pub struct ScriptedDriver {
        pub fail_every: u64,
        pub calls: AtomicU64,
    }

    impl ScriptedDriver {
        pub fn new(fail_every: u64) -> Self {
            Self {
                fail_every,
                calls: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl OrderDriver for ScriptedDriver {
        fn protocol(&self) -> Protocol {
            Protocol::Http
        }

        async fn submit(&self, _request: &CreateOrderRequest) -> Result<Exchange, Failure> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_every > 0 && n % self.fail_every == 0 {
                return Err(Failure {
                    kind: FailureKind::Connection,
                    latency: Duration::from_millis(1),
                    message: "connection refused".to_string(),
                });
            }
            Ok(Exchange {
                latency: Duration::from_millis(n),
                checks: vec![Check::new(CHECK_STATUS, true), Check::new(CHECK_ORDER, true)],
                bytes_sent: 100,
                bytes_received: 50,
            })
        }
    }
}
