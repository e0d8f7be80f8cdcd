//! Debounce decision engine.
//!
//! Decides whether a trigger intent may schedule a build. Rules, in order:
//!
//! 1. "Disable automatic build by default" plus a created/reopened event:
//!    set the suppression flag and suppress.
//! 2. Suppression flag set and the intent is not forced: suppress.
//! 3. Created: accept iff `trigger_on_create`.
//! 4. Source updated: accept iff `trigger_on_update` and the head moved.
//! 5. Reopened: accept iff `trigger_on_reopen`.
//! 6. Forced: always accept, ahead of all other rules.

use prtrigger_core::{RepositorySettings, SuppressionKey, TriggerIntent};
use tracing::{debug, error};

use crate::suppression::{SuppressionFlags, SuppressionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Rule 1: this event switched suppression on.
    SuppressionActivated,
    /// Rule 2: suppression was already on.
    Suppressed,
    /// The repository does not trigger on this kind of event.
    PolicyDisabled,
    /// A source update that did not move the branch head.
    HeadUnchanged,
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressReason::SuppressionActivated => write!(f, "automatic build disabled by default"),
            SuppressReason::Suppressed => write!(f, "automatic build disabled"),
            SuppressReason::PolicyDisabled => write!(f, "trigger disabled for this event"),
            SuppressReason::HeadUnchanged => write!(f, "source branch head unchanged"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Suppress(SuppressReason),
}

/// Apply the rules to an intent. Pure; the caller performs the flag write
/// that `SuppressionActivated` asks for.
pub fn evaluate(
    intent: TriggerIntent,
    settings: &RepositorySettings,
    suppression: SuppressionState,
) -> Decision {
    use TriggerIntent::*;

    if intent == Forced {
        return Decision::Accept;
    }

    if settings.disable_automatic_build_by_default && matches!(intent, Created | Reopened) {
        return Decision::Suppress(SuppressReason::SuppressionActivated);
    }

    if suppression.is_suppressed() {
        return Decision::Suppress(SuppressReason::Suppressed);
    }

    let accepted = match intent {
        Created => settings.trigger_on_create,
        SourceUpdated { head_changed } => {
            if !head_changed {
                return Decision::Suppress(SuppressReason::HeadUnchanged);
            }
            settings.trigger_on_update
        }
        Reopened => settings.trigger_on_reopen,
        Forced => true,
    };

    if accepted {
        Decision::Accept
    } else {
        Decision::Suppress(SuppressReason::PolicyDisabled)
    }
}

/// Runs [`evaluate`] against the stored suppression state.
#[derive(Clone)]
pub struct DecisionEngine {
    flags: SuppressionFlags,
}

impl DecisionEngine {
    pub fn new(flags: SuppressionFlags) -> Self {
        Self { flags }
    }

    pub async fn decide(
        &self,
        key: &SuppressionKey,
        intent: TriggerIntent,
        settings: &RepositorySettings,
    ) -> Decision {
        let suppression = if intent == TriggerIntent::Forced {
            SuppressionState::Enabled
        } else {
            match self.flags.state(key).await {
                Ok(state) => state,
                Err(e) => {
                    // Fail closed: an unreadable flag never lets a build through.
                    error!(key = %key, error = %e, "Failed to read suppression flag");
                    SuppressionState::Suppressed
                }
            }
        };

        let decision = evaluate(intent, settings, suppression);

        if decision == Decision::Suppress(SuppressReason::SuppressionActivated) {
            if let Err(e) = self.flags.suppress(key).await {
                error!(key = %key, error = %e, "Failed to set suppression flag");
            }
        }

        debug!(key = %key, ?intent, ?decision, "Evaluated trigger");
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prtrigger_db::MemoryStateStore;
    use std::sync::Arc;

    fn all_enabled() -> RepositorySettings {
        RepositorySettings {
            trigger_on_create: true,
            trigger_on_update: true,
            trigger_on_reopen: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_never_trigger() {
        let settings = RepositorySettings::default();
        for intent in [
            TriggerIntent::Created,
            TriggerIntent::SourceUpdated { head_changed: true },
            TriggerIntent::Reopened,
        ] {
            assert_eq!(
                evaluate(intent, &settings, SuppressionState::Enabled),
                Decision::Suppress(SuppressReason::PolicyDisabled)
            );
        }
    }

    #[test]
    fn test_enabled_policy_accepts() {
        let settings = all_enabled();
        assert_eq!(
            evaluate(TriggerIntent::Created, &settings, SuppressionState::Enabled),
            Decision::Accept
        );
        assert_eq!(
            evaluate(
                TriggerIntent::SourceUpdated { head_changed: true },
                &settings,
                SuppressionState::Enabled
            ),
            Decision::Accept
        );
        assert_eq!(
            evaluate(TriggerIntent::Reopened, &settings, SuppressionState::Enabled),
            Decision::Accept
        );
    }

    #[test]
    fn test_unchanged_head_is_never_a_trigger() {
        assert_eq!(
            evaluate(
                TriggerIntent::SourceUpdated {
                    head_changed: false
                },
                &all_enabled(),
                SuppressionState::Enabled
            ),
            Decision::Suppress(SuppressReason::HeadUnchanged)
        );
    }

    #[test]
    fn test_disable_by_default_activates_on_create_and_reopen() {
        let settings = RepositorySettings {
            disable_automatic_build_by_default: true,
            ..all_enabled()
        };
        for intent in [TriggerIntent::Created, TriggerIntent::Reopened] {
            assert_eq!(
                evaluate(intent, &settings, SuppressionState::Enabled),
                Decision::Suppress(SuppressReason::SuppressionActivated)
            );
        }
        // Updates only look at the flag itself.
        assert_eq!(
            evaluate(
                TriggerIntent::SourceUpdated { head_changed: true },
                &settings,
                SuppressionState::Enabled
            ),
            Decision::Accept
        );
    }

    #[test]
    fn test_suppressed_flag_blocks_all_but_forced() {
        let settings = all_enabled();
        for intent in [
            TriggerIntent::Created,
            TriggerIntent::SourceUpdated { head_changed: true },
            TriggerIntent::Reopened,
        ] {
            assert_eq!(
                evaluate(intent, &settings, SuppressionState::Suppressed),
                Decision::Suppress(SuppressReason::Suppressed)
            );
        }
        assert_eq!(
            evaluate(TriggerIntent::Forced, &settings, SuppressionState::Suppressed),
            Decision::Accept
        );
    }

    #[test]
    fn test_forced_ignores_policy() {
        let settings = RepositorySettings {
            disable_automatic_build_by_default: true,
            ..Default::default()
        };
        assert_eq!(
            evaluate(TriggerIntent::Forced, &settings, SuppressionState::Enabled),
            Decision::Accept
        );
    }

    #[tokio::test]
    async fn test_engine_sets_flag_on_activation() {
        let flags = SuppressionFlags::new(Arc::new(MemoryStateStore::new()));
        let engine = DecisionEngine::new(flags.clone());
        let key = SuppressionKey::new("PROJ", "repo-a", 7);
        let settings = RepositorySettings {
            disable_automatic_build_by_default: true,
            ..all_enabled()
        };

        let decision = engine.decide(&key, TriggerIntent::Created, &settings).await;
        assert_eq!(
            decision,
            Decision::Suppress(SuppressReason::SuppressionActivated)
        );
        assert_eq!(flags.state(&key).await.unwrap(), SuppressionState::Suppressed);

        let decision = engine
            .decide(
                &key,
                TriggerIntent::SourceUpdated { head_changed: true },
                &settings,
            )
            .await;
        assert_eq!(decision, Decision::Suppress(SuppressReason::Suppressed));
    }

    #[tokio::test]
    async fn test_engine_does_not_write_for_plain_rejections() {
        let store = Arc::new(MemoryStateStore::new());
        let engine = DecisionEngine::new(SuppressionFlags::new(store.clone()));
        let key = SuppressionKey::new("PROJ", "repo-a", 7);

        engine
            .decide(&key, TriggerIntent::Created, &RepositorySettings::default())
            .await;
        assert!(!store.contains(&key.to_string()).await);
    }
}
