//! Interval scheduler with a single-active-run guard and a fixed retry budget.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::domain::error::Result;

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    /// Execute once and return a human-readable summary.
    async fn run(&self) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerResult {
    Completed(String),
    Failed(String),
    /// Another run was still active
    Suppressed,
}

#[derive(Clone)]
pub struct Scheduler {
    interval: Duration,
    retries: u32,
    retry_delay: Duration,
    active: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(interval: Duration, retries: u32, retry_delay: Duration) -> Self {
        Self {
            interval,
            retries,
            retry_delay,
            active: Arc::new(Mutex::new(())),
        }
    }

    /// Run the job, retrying up to `retries` times after `retry_delay`.
    pub async fn run_with_retries(&self, job: &dyn Job) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match job.run().await {
                Ok(summary) => return Ok(summary),
                Err(err) if attempt <= self.retries => {
                    warn!(
                        job = job.name(),
                        attempt,
                        retry_in_secs = self.retry_delay.as_secs(),
                        error = %err,
                        "Run failed, retrying"
                    );
                    sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Start a run unless one is already active.
    pub async fn trigger(&self, job: Arc<dyn Job>) -> TriggerResult {
        let Ok(_guard) = self.active.clone().try_lock_owned() else {
            info!(job = job.name(), "Previous run still active, skipping trigger");
            return TriggerResult::Suppressed;
        };

        match self.run_with_retries(job.as_ref()).await {
            Ok(summary) => {
                info!(job = job.name(), summary = %summary, "Run succeeded");
                TriggerResult::Completed(summary)
            }
            Err(err) => {
                error!(job = job.name(), error = %err, "Run failed");
                TriggerResult::Failed(err.to_string())
            }
        }
    }

    /// Trigger the job on every interval tick until `shutdown` resolves.
    /// Ticks are spawned so a long run never delays the timer.
    pub async fn run_until<F>(&self, job: Arc<dyn Job>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            job = job.name(),
            interval_secs = self.interval.as_secs(),
            retries = self.retries,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(job = job.name(), "Scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let scheduler = self.clone();
                    let job = job.clone();
                    tokio::spawn(async move {
                        scheduler.trigger(job).await;
                    });
                }
            }
        }
    }
}
