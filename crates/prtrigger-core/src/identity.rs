//! User identities.
//!
//! A triggering action always runs as the identity captured when the event
//! was accepted. The identity is passed explicitly to the CI trigger, there is
//! no ambient "current user".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A resolved user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Login name, as captured in job payloads.
    pub name: String,
    pub display_name: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Resolves captured user names back into identities.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Record (or refresh) a user seen on an incoming event.
    async fn remember(&self, identity: &Identity) -> Result<()>;

    /// Look up a user by login name. `Ok(None)` when the user is unknown.
    async fn find_by_name(&self, name: &str) -> Result<Option<Identity>>;
}
