//! Wiring of storage backends, the scheduler and the worker.

use anyhow::Context;
use prtrigger_config::{Config, StaticSettings};
use prtrigger_core::ci::CiTrigger;
use prtrigger_core::clock::Clock;
use prtrigger_core::identity::UserDirectory;
use prtrigger_core::jobs::JobRunner;
use prtrigger_core::pull_request::PullRequestStore;
use prtrigger_core::store::StateStore;
use prtrigger_db::{
    MemoryJobRunner, MemoryPullRequestStore, MemoryStateStore, MemoryUserDirectory, PgJobRunner,
    PgPullRequestStore, PgStateStore, PgUserDirectory, create_pool, run_migrations,
};
use prtrigger_scheduler::{
    EventIntake, PendingMarkers, ScheduleCoordinator, SuppressionFlags, TriggerExecutor, Worker,
    WorkerConfig,
};
use std::sync::Arc;
use tracing::info;

use crate::state::Storage;

/// Storage shared by every component on this node.
#[derive(Clone)]
pub struct Backends {
    pub state: Arc<dyn StateStore>,
    pub runner: Arc<dyn JobRunner>,
    pub pull_requests: Arc<dyn PullRequestStore>,
    pub users: Arc<dyn UserDirectory>,
    pub storage: Storage,
}

impl Backends {
    /// Single-node backends that live in process memory.
    pub fn memory() -> Self {
        Self {
            state: Arc::new(MemoryStateStore::new()),
            runner: Arc::new(MemoryJobRunner::new()),
            pull_requests: Arc::new(MemoryPullRequestStore::new()),
            users: Arc::new(MemoryUserDirectory::new()),
            storage: Storage::Memory,
        }
    }

    /// Cluster backends on PostgreSQL. Runs pending migrations.
    pub async fn postgres(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to database...");
        let pool = create_pool(database_url)
            .await
            .context("failed to connect to database")?;
        run_migrations(&pool)
            .await
            .context("failed to run database migrations")?;
        info!("Database connected");

        Ok(Self {
            state: Arc::new(PgStateStore::new(pool.clone())),
            runner: Arc::new(PgJobRunner::new(pool.clone())),
            pull_requests: Arc::new(PgPullRequestStore::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool)),
            storage: Storage::Postgres,
        })
    }
}

/// The event intake and this node's worker.
pub struct Scheduler {
    pub intake: EventIntake,
    pub worker: Worker,
}

pub fn assemble(
    config: &Config,
    backends: &Backends,
    node_id: &str,
    ci: Arc<dyn CiTrigger>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Scheduler> {
    let markers = PendingMarkers::new(backends.state.clone());
    let flags = SuppressionFlags::new(backends.state.clone());
    let coordinator =
        ScheduleCoordinator::new(markers.clone(), backends.runner.clone(), clock.clone());

    let executor = TriggerExecutor::new(
        backends.pull_requests.clone(),
        backends.users.clone(),
        ci,
        markers.clone(),
        config.server.trigger_timeout,
    );

    let intake = EventIntake::new(
        Arc::new(StaticSettings::new(config.repositories.clone())),
        backends.pull_requests.clone(),
        backends.users.clone(),
        coordinator,
        markers,
        flags,
    );

    let worker_config = WorkerConfig {
        poll_interval: config.server.poll_interval,
        claim_timeout: chrono::Duration::from_std(config.server.claim_timeout)
            .context("claim timeout out of range")?,
    };
    let worker = Worker::new(
        node_id,
        backends.runner.clone(),
        Arc::new(executor),
        clock,
        worker_config,
    );

    Ok(Scheduler { intake, worker })
}
