//! Core domain types and traits for the pull-request build trigger scheduler.
//!
//! This crate contains:
//! - Schedule and suppression keys
//! - Trigger event kinds, intents and pull-request lifecycle events
//! - The job payload carried through the cluster job runner
//! - Collaborator traits (state store, job runner, pull-request source,
//!   user directory, CI trigger, settings source, clock)

pub mod ci;
pub mod clock;
pub mod error;
pub mod event;
pub mod identity;
pub mod jobs;
pub mod key;
pub mod pull_request;
pub mod settings;
pub mod store;

pub use error::{Error, Result};
pub use event::{LifecycleEvent, LifecycleKind, TriggerEventKind, TriggerIntent};
pub use identity::Identity;
pub use jobs::JobPayload;
pub use key::{ScheduleKey, SuppressionKey};
pub use pull_request::{PullRequest, PullRequestRef};
pub use settings::RepositorySettings;
