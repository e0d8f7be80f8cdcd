//! Schedule coordinator.
//!
//! Owns the pending schedule markers and talks to the cluster job runner.
//! The marker check and the marker write are not atomic: two nodes racing on
//! the same key may both schedule. That is fine because the job runner keeps
//! one job per key, so the race never produces a second execution.

use chrono::{DateTime, Duration, Utc};
use prtrigger_core::clock::Clock;
use prtrigger_core::jobs::{JobRunner, ScheduledJob};
use prtrigger_core::{Error, JobPayload, Result, ScheduleKey};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::marker::PendingMarkers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled { fire_at: DateTime<Utc> },
    /// A job for this key is still waiting to fire.
    SkippedAlreadyPending { fire_at: DateTime<Utc> },
}

#[derive(Clone)]
pub struct ScheduleCoordinator {
    markers: PendingMarkers,
    runner: Arc<dyn JobRunner>,
    clock: Arc<dyn Clock>,
}

impl ScheduleCoordinator {
    pub fn new(markers: PendingMarkers, runner: Arc<dyn JobRunner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            markers,
            runner,
            clock,
        }
    }

    /// Schedule a trigger unless one is already pending.
    ///
    /// A marker whose fire time has passed no longer blocks: it belongs to a
    /// job that already ran (or whose scheduling failed) and is overwritten.
    pub async fn request_schedule(
        &self,
        key: &ScheduleKey,
        payload: JobPayload,
        debounce_delay: Duration,
    ) -> Result<ScheduleOutcome> {
        let now = self.clock.now();

        if let Some(fire_at) = self.markers.read(key).await? {
            if fire_at > now {
                debug!(key = %key, %fire_at, "Trigger already pending");
                return Ok(ScheduleOutcome::SkippedAlreadyPending { fire_at });
            }
        }

        let fire_at = self.schedule_now(key, payload, debounce_delay).await?;
        Ok(ScheduleOutcome::Scheduled { fire_at })
    }

    /// Schedule a trigger `delay` from now, replacing any pending one.
    ///
    /// The marker is written first and is not rolled back if the job runner
    /// rejects the job; a stale marker stops blocking once its time passes.
    pub async fn schedule_now(
        &self,
        key: &ScheduleKey,
        payload: JobPayload,
        delay: Duration,
    ) -> Result<DateTime<Utc>> {
        let fire_at = self
            .clock
            .now()
            .checked_add_signed(delay)
            .ok_or_else(|| Error::Scheduling(format!("delay of {delay} is out of range")))?;
        self.markers.write(key, fire_at).await?;

        let event = payload.event;
        let job = ScheduledJob {
            key: key.to_string(),
            run_at: fire_at,
            payload,
        };

        if let Err(e) = self.runner.schedule_once(job).await {
            error!(key = %key, %fire_at, error = %e, "Failed to schedule build trigger");
            return Err(e);
        }

        info!(key = %key, %fire_at, %event, "Scheduled build trigger");
        Ok(fire_at)
    }

    /// Best-effort cancel of the pending job for `key`. Returns whether a
    /// pending job was removed.
    pub async fn unschedule(&self, key: &ScheduleKey) -> bool {
        match self.runner.unschedule(&key.to_string()).await {
            Ok(true) => {
                info!(key = %key, "Unscheduled pending build trigger");
                true
            }
            Ok(false) => {
                debug!(key = %key, "No pending build trigger to unschedule");
                false
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to unschedule build trigger");
                false
            }
        }
    }
}
