//! Entry points for pull-request lifecycle events, forced triggers and the
//! automatic-build switch.
//!
//! Nothing here propagates I/O failures to the event source: every path ends
//! in an outcome value and a log line.

use chrono::{DateTime, Duration, Utc};
use prtrigger_core::identity::UserDirectory;
use prtrigger_core::pull_request::PullRequestStore;
use prtrigger_core::settings::SettingsSource;
use prtrigger_core::{
    Error, Identity, JobPayload, LifecycleEvent, PullRequest, PullRequestRef, RepositorySettings,
    Result, TriggerIntent,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::coordinator::{ScheduleCoordinator, ScheduleOutcome};
use crate::decision::{Decision, DecisionEngine, SuppressReason};
use crate::marker::PendingMarkers;
use crate::suppression::{SuppressionFlags, SuppressionState};

/// Delay before a forced trigger fires.
pub const FORCED_DELAY_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Scheduled { fire_at: DateTime<Utc> },
    AlreadyPending { fire_at: DateTime<Utc> },
    Suppressed(SuppressReason),
    /// Merge or decline: schedule state for the pull request was dropped.
    Cleared,
    SchedulingFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForceOutcome {
    Ok { fire_at: DateTime<Utc> },
    NotFound,
    SchedulingError(String),
}

#[derive(Clone)]
pub struct EventIntake {
    settings: Arc<dyn SettingsSource>,
    pull_requests: Arc<dyn PullRequestStore>,
    users: Arc<dyn UserDirectory>,
    decisions: DecisionEngine,
    coordinator: ScheduleCoordinator,
    markers: PendingMarkers,
    flags: SuppressionFlags,
}

impl EventIntake {
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        pull_requests: Arc<dyn PullRequestStore>,
        users: Arc<dyn UserDirectory>,
        coordinator: ScheduleCoordinator,
        markers: PendingMarkers,
        flags: SuppressionFlags,
    ) -> Self {
        Self {
            settings,
            pull_requests,
            users,
            decisions: DecisionEngine::new(flags.clone()),
            coordinator,
            markers,
            flags,
        }
    }

    /// Handle one lifecycle notification.
    pub async fn handle(&self, event: LifecycleEvent) -> IntakeOutcome {
        let pr = &event.pull_request;

        if let Err(e) = self.users.remember(&event.actor).await {
            warn!(user = %event.actor, error = %e, "Failed to record event actor");
        }

        // Merged and declined carry no intent.
        let Some(intent) = event.intent() else {
            self.clear(pr).await;
            return IntakeOutcome::Cleared;
        };

        if let Err(e) = self.pull_requests.upsert(pr).await {
            warn!(pull_request = %pr.reference(), error = %e, "Failed to refresh pull request");
        }

        let settings = self.settings_for(&pr.to_slug).await;
        let decision = self
            .decisions
            .decide(&pr.suppression_key(), intent, &settings)
            .await;

        if let Decision::Suppress(reason) = decision {
            info!(
                pull_request = %pr.reference(),
                slug = %pr.slug,
                event = %intent.kind(),
                %reason,
                "Build trigger suppressed"
            );
            return IntakeOutcome::Suppressed(reason);
        }

        let payload = JobPayload {
            pull_request_id: pr.id,
            repository_id: pr.repository_id,
            slug: pr.slug.clone(),
            event: intent.kind(),
            user: event.actor.name.clone(),
        };

        match self
            .coordinator
            .request_schedule(&pr.schedule_key(), payload, settings.debounce_delay)
            .await
        {
            Ok(ScheduleOutcome::Scheduled { fire_at }) => IntakeOutcome::Scheduled { fire_at },
            Ok(ScheduleOutcome::SkippedAlreadyPending { fire_at }) => {
                IntakeOutcome::AlreadyPending { fire_at }
            }
            Err(e) => {
                error!(key = %pr.schedule_key(), error = %e, "Failed to schedule build trigger");
                IntakeOutcome::SchedulingFailed(e.to_string())
            }
        }
    }

    /// Replace whatever is pending with a forced trigger that fires after
    /// [`FORCED_DELAY_SECS`], running as `user`.
    pub async fn force_schedule(&self, reference: PullRequestRef, user: &Identity) -> ForceOutcome {
        let pr = match self.pull_requests.get_by_id(reference).await {
            Ok(Some(pr)) => pr,
            Ok(None) => return ForceOutcome::NotFound,
            Err(e) => {
                error!(pull_request = %reference, error = %e, "Failed to load pull request");
                return ForceOutcome::SchedulingError(e.to_string());
            }
        };

        if let Err(e) = self.users.remember(user).await {
            warn!(user = %user, error = %e, "Failed to record triggering user");
        }

        // Forced intents bypass every rule, settings are not consulted.
        let decision = self
            .decisions
            .decide(
                &pr.suppression_key(),
                TriggerIntent::Forced,
                &RepositorySettings::default(),
            )
            .await;
        if let Decision::Suppress(reason) = decision {
            return ForceOutcome::SchedulingError(reason.to_string());
        }

        let key = pr.schedule_key();
        self.coordinator.unschedule(&key).await;

        let payload = JobPayload {
            pull_request_id: pr.id,
            repository_id: pr.repository_id,
            slug: pr.slug.clone(),
            event: TriggerIntent::Forced.kind(),
            user: user.name.clone(),
        };

        match self
            .coordinator
            .schedule_now(&key, payload, Duration::seconds(FORCED_DELAY_SECS))
            .await
        {
            Ok(fire_at) => {
                info!(key = %key, user = %user, %fire_at, "Forced build trigger scheduled");
                ForceOutcome::Ok { fire_at }
            }
            Err(e) => ForceOutcome::SchedulingError(e.to_string()),
        }
    }

    pub async fn automatic_build_status(&self, reference: PullRequestRef) -> Result<SuppressionState> {
        let pr = self.require(reference).await?;
        self.flags.state(&pr.suppression_key()).await
    }

    /// Explicitly enable (clear the flag) or disable (set the flag)
    /// automatic builds for a pull request.
    pub async fn set_automatic_build(
        &self,
        reference: PullRequestRef,
        enabled: bool,
    ) -> Result<SuppressionState> {
        let pr = self.require(reference).await?;
        let key = pr.suppression_key();

        if enabled {
            self.flags.clear(&key).await?;
            info!(key = %key, "Automatic build enabled");
            Ok(SuppressionState::Enabled)
        } else {
            self.flags.suppress(&key).await?;
            info!(key = %key, "Automatic build disabled");
            Ok(SuppressionState::Suppressed)
        }
    }

    async fn require(&self, reference: PullRequestRef) -> Result<PullRequest> {
        self.pull_requests
            .get_by_id(reference)
            .await?
            .ok_or_else(|| Error::NotFound(format!("pull request {reference}")))
    }

    async fn settings_for(&self, slug: &str) -> RepositorySettings {
        match self.settings.settings_for(slug).await {
            Ok(settings) => settings,
            Err(e) => {
                // All flags off: nothing triggers until settings load again.
                error!(slug = %slug, error = %e, "Failed to load repository settings");
                RepositorySettings::default()
            }
        }
    }

    /// Merge/decline cleanup. Every step is idempotent and independent.
    async fn clear(&self, pr: &PullRequest) {
        let schedule_key = pr.schedule_key();
        if let Err(e) = self.markers.clear(&schedule_key).await {
            warn!(key = %schedule_key, error = %e, "Failed to clear schedule marker");
        }

        let suppression_key = pr.suppression_key();
        if let Err(e) = self.flags.clear(&suppression_key).await {
            warn!(key = %suppression_key, error = %e, "Failed to clear suppression flag");
        }

        if let Err(e) = self.pull_requests.remove(pr.reference()).await {
            warn!(pull_request = %pr.reference(), error = %e, "Failed to drop pull request");
        }

        info!(pull_request = %pr.reference(), slug = %pr.slug, "Pull request closed, schedule state cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BrokenReadStore, FixedSettings, alice, at, pull_request};
    use prtrigger_core::clock::ManualClock;
    use prtrigger_core::store::StateStore;
    use prtrigger_core::{LifecycleKind, TriggerEventKind};
    use prtrigger_db::{MemoryJobRunner, MemoryPullRequestStore, MemoryStateStore, MemoryUserDirectory};

    struct Harness {
        clock: Arc<ManualClock>,
        runner: Arc<MemoryJobRunner>,
        pull_requests: Arc<MemoryPullRequestStore>,
        users: Arc<MemoryUserDirectory>,
        markers: PendingMarkers,
        flags: SuppressionFlags,
        intake: EventIntake,
    }

    fn harness_with(settings: RepositorySettings, flag_store: Arc<dyn StateStore>) -> Harness {
        harness_from(Arc::new(FixedSettings(settings)), flag_store)
    }

    fn harness_from(settings: Arc<dyn SettingsSource>, flag_store: Arc<dyn StateStore>) -> Harness {
        let clock = Arc::new(ManualClock::new(at(0)));
        let runner = Arc::new(MemoryJobRunner::new());
        let pull_requests = Arc::new(MemoryPullRequestStore::new());
        let users = Arc::new(MemoryUserDirectory::new());
        let markers = PendingMarkers::new(Arc::new(MemoryStateStore::new()));
        let flags = SuppressionFlags::new(flag_store);
        let coordinator = ScheduleCoordinator::new(markers.clone(), runner.clone(), clock.clone());
        let intake = EventIntake::new(
            settings,
            pull_requests.clone(),
            users.clone(),
            coordinator,
            markers.clone(),
            flags.clone(),
        );
        Harness {
            clock,
            runner,
            pull_requests,
            users,
            markers,
            flags,
            intake,
        }
    }

    fn harness(settings: RepositorySettings) -> Harness {
        harness_with(settings, Arc::new(MemoryStateStore::new()))
    }

    fn all_enabled() -> RepositorySettings {
        RepositorySettings {
            trigger_on_create: true,
            trigger_on_update: true,
            trigger_on_reopen: true,
            ..Default::default()
        }
    }

    /// Settings configured for one repository only.
    struct OnlyRepository(&'static str, RepositorySettings);

    #[async_trait::async_trait]
    impl SettingsSource for OnlyRepository {
        async fn settings_for(&self, slug: &str) -> Result<RepositorySettings> {
            if slug == self.0 {
                Ok(self.1.clone())
            } else {
                Ok(RepositorySettings::default())
            }
        }
    }

    fn event(kind: LifecycleKind) -> LifecycleEvent {
        LifecycleEvent {
            kind,
            pull_request: pull_request(),
            actor: alice(),
        }
    }

    fn rescoped(new_head: &str) -> LifecycleEvent {
        let mut event = event(LifecycleKind::Rescoped {
            previous_from_hash: pull_request().latest_commit,
        });
        event.pull_request.latest_commit = new_head.to_string();
        event
    }

    #[tokio::test]
    async fn test_burst_of_updates_schedules_once() {
        let h = harness(all_enabled());

        let outcome = h.intake.handle(event(LifecycleKind::Opened)).await;
        assert_eq!(outcome, IntakeOutcome::Scheduled { fire_at: at(30) });

        for (t, head) in [(2, "c1"), (5, "c2"), (9, "c3")] {
            h.clock.set(at(t));
            let outcome = h.intake.handle(rescoped(head)).await;
            assert_eq!(outcome, IntakeOutcome::AlreadyPending { fire_at: at(30) });
        }

        let pending = h.runner.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].run_at, at(30));
        assert_eq!(pending[0].payload.user, "alice");

        // The mirror carries the newest head for the executor to pick up.
        let live = h
            .pull_requests
            .get_by_id(pull_request().reference())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.latest_commit, "c3");
        assert!(h.users.find_by_name("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_event_after_fire_time_schedules_again() {
        let h = harness(all_enabled());
        h.intake.handle(event(LifecycleKind::Opened)).await;

        h.clock.set(at(45));
        let outcome = h.intake.handle(rescoped("c1")).await;
        assert_eq!(outcome, IntakeOutcome::Scheduled { fire_at: at(75) });
    }

    #[tokio::test]
    async fn test_unchanged_head_never_schedules() {
        let h = harness(all_enabled());
        let outcome = h
            .intake
            .handle(rescoped(&pull_request().latest_commit))
            .await;
        assert_eq!(
            outcome,
            IntakeOutcome::Suppressed(SuppressReason::HeadUnchanged)
        );
        assert!(h.runner.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_default_settings_never_schedule() {
        let h = harness(RepositorySettings::default());
        let outcome = h.intake.handle(event(LifecycleKind::Opened)).await;
        assert_eq!(
            outcome,
            IntakeOutcome::Suppressed(SuppressReason::PolicyDisabled)
        );
        assert_eq!(h.runner.schedule_calls(), 0);
    }

    #[tokio::test]
    async fn test_disable_by_default_then_force() {
        let settings = RepositorySettings {
            disable_automatic_build_by_default: true,
            ..all_enabled()
        };
        let h = harness(settings);
        let key = pull_request().suppression_key();

        let outcome = h.intake.handle(event(LifecycleKind::Opened)).await;
        assert_eq!(
            outcome,
            IntakeOutcome::Suppressed(SuppressReason::SuppressionActivated)
        );
        assert_eq!(h.flags.state(&key).await.unwrap(), SuppressionState::Suppressed);

        let outcome = h.intake.handle(rescoped("c1")).await;
        assert_eq!(outcome, IntakeOutcome::Suppressed(SuppressReason::Suppressed));
        assert!(h.runner.pending().await.is_empty());

        h.clock.set(at(100));
        let outcome = h
            .intake
            .force_schedule(pull_request().reference(), &Identity::new("bob", "Bob"))
            .await;
        assert_eq!(outcome, ForceOutcome::Ok { fire_at: at(130) });

        let pending = h.runner.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload.event, TriggerEventKind::Forced);
        assert_eq!(pending[0].payload.user, "bob");
        // Forcing does not lift suppression.
        assert_eq!(h.flags.state(&key).await.unwrap(), SuppressionState::Suppressed);
    }

    #[tokio::test]
    async fn test_force_replaces_pending_schedule() {
        let settings = RepositorySettings {
            debounce_delay: Duration::seconds(600),
            ..all_enabled()
        };
        let h = harness(settings);
        h.intake.handle(event(LifecycleKind::Opened)).await;

        h.clock.set(at(10));
        let outcome = h.intake.force_schedule(pull_request().reference(), &alice()).await;
        assert_eq!(outcome, ForceOutcome::Ok { fire_at: at(40) });

        let pending = h.runner.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].run_at, at(40));
        assert_eq!(
            h.markers.read(&pull_request().schedule_key()).await.unwrap(),
            Some(at(40))
        );
    }

    #[tokio::test]
    async fn test_force_unknown_pull_request() {
        let h = harness(all_enabled());
        let outcome = h.intake.force_schedule(pull_request().reference(), &alice()).await;
        assert_eq!(outcome, ForceOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_fork_uses_destination_repository_settings() {
        let settings = RepositorySettings {
            disable_automatic_build_by_default: true,
            ..all_enabled()
        };
        let h = harness_from(
            Arc::new(OnlyRepository("repo-a", settings)),
            Arc::new(MemoryStateStore::new()),
        );
        let mut opened = event(LifecycleKind::Opened);
        opened.pull_request.slug = "alice-fork".to_string();
        let key = opened.pull_request.suppression_key();
        assert_eq!(key.to_string(), "suppress:PROJ:repo-a:7");

        let outcome = h.intake.handle(opened.clone()).await;
        assert_eq!(
            outcome,
            IntakeOutcome::Suppressed(SuppressReason::SuppressionActivated)
        );
        assert_eq!(h.flags.state(&key).await.unwrap(), SuppressionState::Suppressed);

        // Closing the fork pull request lifts the same destination-scoped flag.
        opened.kind = LifecycleKind::Declined;
        assert_eq!(h.intake.handle(opened).await, IntakeOutcome::Cleared);
        assert_eq!(h.flags.state(&key).await.unwrap(), SuppressionState::Enabled);
    }

    #[tokio::test]
    async fn test_merge_clears_marker_flag_and_mirror() {
        let settings = RepositorySettings {
            disable_automatic_build_by_default: true,
            ..all_enabled()
        };
        let h = harness(settings);
        h.intake.handle(event(LifecycleKind::Opened)).await;
        h.markers
            .write(&pull_request().schedule_key(), at(30))
            .await
            .unwrap();

        let outcome = h.intake.handle(event(LifecycleKind::Merged)).await;
        assert_eq!(outcome, IntakeOutcome::Cleared);
        assert_eq!(
            h.flags.state(&pull_request().suppression_key()).await.unwrap(),
            SuppressionState::Enabled
        );
        assert_eq!(
            h.markers.read(&pull_request().schedule_key()).await.unwrap(),
            None
        );
        assert!(
            h.pull_requests
                .get_by_id(pull_request().reference())
                .await
                .unwrap()
                .is_none()
        );

        // Declining afterwards is a harmless repeat.
        let outcome = h.intake.handle(event(LifecycleKind::Declined)).await;
        assert_eq!(outcome, IntakeOutcome::Cleared);
    }

    #[tokio::test]
    async fn test_unreadable_flag_fails_closed() {
        let h = harness_with(all_enabled(), Arc::new(BrokenReadStore));
        let outcome = h.intake.handle(event(LifecycleKind::Opened)).await;
        assert_eq!(outcome, IntakeOutcome::Suppressed(SuppressReason::Suppressed));
        assert!(h.runner.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_automatic_build_toggle() {
        let h = harness(all_enabled());
        let reference = pull_request().reference();

        assert!(matches!(
            h.intake.automatic_build_status(reference).await,
            Err(Error::NotFound(_))
        ));

        h.pull_requests.upsert(&pull_request()).await.unwrap();
        assert_eq!(
            h.intake.automatic_build_status(reference).await.unwrap(),
            SuppressionState::Enabled
        );

        let state = h.intake.set_automatic_build(reference, false).await.unwrap();
        assert_eq!(state, SuppressionState::Suppressed);
        assert_eq!(
            h.intake.handle(rescoped("c1")).await,
            IntakeOutcome::Suppressed(SuppressReason::Suppressed)
        );

        let state = h.intake.set_automatic_build(reference, true).await.unwrap();
        assert_eq!(state, SuppressionState::Enabled);
        assert_eq!(
            h.intake.handle(rescoped("c2")).await,
            IntakeOutcome::Scheduled { fire_at: at(30) }
        );
    }
}
