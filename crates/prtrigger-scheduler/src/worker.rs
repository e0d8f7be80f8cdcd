//! Worker that fires due jobs from the cluster job runner.
//!
//! Every node runs one worker. The runner hands each due job to exactly one
//! of them.

use chrono::Duration as ChronoDuration;
use prtrigger_core::clock::Clock;
use prtrigger_core::jobs::{JobHandler, JobRunner};
use prtrigger_core::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between polls when no job is due.
    pub poll_interval: Duration,
    /// Claims older than this are treated as abandoned by a dead node.
    pub claim_timeout: ChronoDuration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            claim_timeout: ChronoDuration::minutes(5),
        }
    }
}

/// A worker that claims and executes due jobs.
pub struct Worker {
    id: String,
    runner: Arc<dyn JobRunner>,
    handler: Arc<dyn JobHandler>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        id: impl Into<String>,
        runner: Arc<dyn JobRunner>,
        handler: Arc<dyn JobHandler>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            id: id.into(),
            runner,
            handler,
            clock,
            config,
        }
    }

    /// Release stale claims, then run every job that is due. Returns the
    /// number of jobs run.
    pub async fn tick(&self) -> Result<usize> {
        let cutoff = self.clock.now() - self.config.claim_timeout;
        let released = self.runner.release_stale(cutoff).await?;
        if released > 0 {
            warn!(worker_id = %self.id, released, "Released stale job claims");
        }

        let mut ran = 0;
        while let Some(job) = self.runner.claim_due(&self.id, self.clock.now()).await? {
            info!(worker_id = %self.id, key = %job.key, generation = job.generation, "Claimed job");

            let outcome = self.handler.run(job.payload.clone()).await;
            if outcome.is_success() {
                info!(key = %job.key, ?outcome, "Job finished");
            } else {
                warn!(key = %job.key, ?outcome, "Job failed");
            }

            if let Err(e) = self.runner.complete(&job).await {
                warn!(key = %job.key, error = %e, "Failed to mark job complete");
            }
            ran += 1;
        }

        Ok(ran)
    }

    /// Run the worker loop until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(worker_id = %self.id, "Starting worker");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let pause = match self.tick().await {
                Ok(_) => self.config.poll_interval,
                Err(e) => {
                    error!(worker_id = %self.id, error = %e, "Job runner unavailable");
                    self.config.poll_interval * 5
                }
            };

            tokio::select! {
                _ = sleep(pause) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!(worker_id = %self.id, "Worker stopped");
    }
}
