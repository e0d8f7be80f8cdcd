//! Settings source backed by the parsed configuration file.

use async_trait::async_trait;
use prtrigger_core::settings::SettingsSource;
use prtrigger_core::{RepositorySettings, Result};
use std::collections::HashMap;

use crate::RepositoryConfig;

/// Repository settings loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    repositories: HashMap<String, RepositoryConfig>,
}

impl StaticSettings {
    pub fn new(repositories: impl IntoIterator<Item = RepositoryConfig>) -> Self {
        Self {
            repositories: repositories
                .into_iter()
                .map(|r| (r.slug.clone(), r))
                .collect(),
        }
    }
}

#[async_trait]
impl SettingsSource for StaticSettings {
    /// Unknown repositories resolve to the all-disabled defaults.
    async fn settings_for(&self, slug: &str) -> Result<RepositorySettings> {
        Ok(self
            .repositories
            .get(slug)
            .map(RepositoryConfig::settings)
            .unwrap_or_default())
    }
}
