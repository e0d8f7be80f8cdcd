//! Debounced, cluster-safe build trigger scheduling.
//!
//! An accepted pull-request event writes a pending schedule marker and hands
//! a run-once job to the cluster job runner. Further events for the same pull
//! request are coalesced until the job fires. When it fires, exactly one node
//! runs the trigger executor, which re-reads the pull request, starts the CI
//! build as the captured user, and clears the marker whatever happens.

pub mod coordinator;
pub mod decision;
pub mod executor;
pub mod intake;
pub mod marker;
pub mod suppression;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{ScheduleCoordinator, ScheduleOutcome};
pub use decision::{Decision, DecisionEngine, SuppressReason};
pub use executor::TriggerExecutor;
pub use intake::{EventIntake, ForceOutcome, IntakeOutcome};
pub use marker::PendingMarkers;
pub use suppression::{SuppressionFlags, SuppressionState};
pub use worker::{Worker, WorkerConfig};
