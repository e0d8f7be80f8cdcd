//! Automatic-build suppression flag.
//!
//! `Enabled` (no flag stored) -> `Suppressed` (flag stored) -> `Enabled`.
//! While suppressed, created/updated/reopened events never schedule a
//! build; forced triggers still do. Merge and decline always clear the flag.

use prtrigger_core::store::StateStore;
use prtrigger_core::{Result, SuppressionKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const FLAG_VALUE: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionState {
    Enabled,
    Suppressed,
}

impl SuppressionState {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, SuppressionState::Suppressed)
    }
}

#[derive(Clone)]
pub struct SuppressionFlags {
    store: Arc<dyn StateStore>,
}

impl SuppressionFlags {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn state(&self, key: &SuppressionKey) -> Result<SuppressionState> {
        Ok(match self.store.get(&key.to_string()).await? {
            Some(_) => SuppressionState::Suppressed,
            None => SuppressionState::Enabled,
        })
    }

    pub async fn suppress(&self, key: &SuppressionKey) -> Result<()> {
        self.store.set(&key.to_string(), FLAG_VALUE).await
    }

    /// Clear the flag. Clearing an absent flag is a no-op.
    pub async fn clear(&self, key: &SuppressionKey) -> Result<()> {
        self.store.delete(&key.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prtrigger_db::MemoryStateStore;

    #[tokio::test]
    async fn test_flag_lifecycle() {
        let flags = SuppressionFlags::new(Arc::new(MemoryStateStore::new()));
        let key = SuppressionKey::new("PROJ", "repo-a", 7);

        assert_eq!(flags.state(&key).await.unwrap(), SuppressionState::Enabled);
        flags.suppress(&key).await.unwrap();
        assert_eq!(flags.state(&key).await.unwrap(), SuppressionState::Suppressed);
        flags.clear(&key).await.unwrap();
        assert_eq!(flags.state(&key).await.unwrap(), SuppressionState::Enabled);
    }

    #[tokio::test]
    async fn test_clearing_unset_flag_is_noop() {
        let flags = SuppressionFlags::new(Arc::new(MemoryStateStore::new()));
        let key = SuppressionKey::new("PROJ", "repo-a", 7);
        flags.clear(&key).await.unwrap();
        assert_eq!(flags.state(&key).await.unwrap(), SuppressionState::Enabled);
    }
}
