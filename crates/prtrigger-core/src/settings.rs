//! Per-repository trigger settings.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Debounce delay used when a repository does not configure one.
pub const DEFAULT_DEBOUNCE_SECS: i64 = 30;

/// Longest accepted debounce delay: one week.
pub const MAX_DEBOUNCE_SECS: i64 = 7 * 24 * 60 * 60;

/// The flags the scheduler reads for a repository.
///
/// Every flag defaults to `false`, so a repository with missing configuration
/// never triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySettings {
    pub trigger_on_create: bool,
    pub trigger_on_update: bool,
    pub trigger_on_reopen: bool,
    pub disable_automatic_build_by_default: bool,
    /// Quiet window between an accepted event and the triggered build.
    pub debounce_delay: Duration,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            trigger_on_create: false,
            trigger_on_update: false,
            trigger_on_reopen: false,
            disable_automatic_build_by_default: false,
            debounce_delay: Duration::seconds(DEFAULT_DEBOUNCE_SECS),
        }
    }
}

/// Resolves settings by repository slug.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn settings_for(&self, slug: &str) -> Result<RepositorySettings>;
}
