//! Key/value state store.

use async_trait::async_trait;

use crate::Result;

/// Per-key scalar storage shared by every node of the cluster.
///
/// Holds the pending schedule markers and the suppression flags. Values are
/// opaque strings; callers own their encoding.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
