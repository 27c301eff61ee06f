//! Fixed-concurrency harness for exercising a driver without the external load engine.
//!
//! Each virtual user is an independent task with its own generator. Staged ramps
//! are not scheduled here; they are exported to the load engine instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use super::{iterate, IterationOutcome, OrderDriver};
use crate::payload::OrderGenerator;

#[derive(Debug, Clone)]
pub struct RunPlan {
    pub vus: u32,
    /// Stop starting new iterations after this long.
    pub duration: Option<Duration>,
    /// Stop each virtual user after this many iterations.
    pub iterations_per_vu: Option<u64>,
    pub pacing: Duration,
    /// Virtual user `n` seeds its generator with `seed + n`.
    pub seed: u64,
}

impl RunPlan {
    fn exhausted(&self, started: Instant, done: u64) -> bool {
        let out_of_time = self.duration.is_some_and(|d| started.elapsed() >= d);
        let out_of_iterations = self.iterations_per_vu.is_some_and(|n| done >= n);
        out_of_time || out_of_iterations
    }
}

pub async fn run(driver: Arc<dyn OrderDriver>, plan: &RunPlan) -> Vec<IterationOutcome> {
    info!(
        protocol = %driver.protocol(),
        vus = plan.vus,
        duration = ?plan.duration,
        iterations_per_vu = ?plan.iterations_per_vu,
        "starting virtual users"
    );

    let started = Instant::now();
    let mut task_set = JoinSet::new();
    for vu in 0..plan.vus {
        let driver = Arc::clone(&driver);
        let plan = plan.clone();
        task_set.spawn(async move {
            let mut generator = OrderGenerator::seeded(plan.seed.wrapping_add(vu as u64));
            let mut outcomes = Vec::new();
            while !plan.exhausted(started, outcomes.len() as u64) {
                outcomes.push(iterate(driver.as_ref(), &mut generator).await);
                sleep(plan.pacing).await;
            }
            outcomes
        });
    }

    let mut all = Vec::new();
    while let Some(joined) = task_set.join_next().await {
        match joined {
            Ok(outcomes) => all.extend(outcomes),
            Err(e) => warn!("virtual user task aborted: {e}"),
        }
    }

    info!(
        iterations = all.len(),
        elapsed = ?started.elapsed(),
        "virtual users finished"
    );
    all
}
