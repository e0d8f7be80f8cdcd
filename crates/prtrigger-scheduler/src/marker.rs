//! Pending schedule markers.
//!
//! A marker holds the fire time of the job currently scheduled for a pull
//! request. Its presence with a future timestamp is what coalesces a burst of
//! events into one build.

use chrono::{DateTime, Utc};
use prtrigger_core::store::StateStore;
use prtrigger_core::{Result, ScheduleKey};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct PendingMarkers {
    store: Arc<dyn StateStore>,
}

impl PendingMarkers {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// The recorded fire time, if any. An unreadable value counts as absent.
    pub async fn read(&self, key: &ScheduleKey) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(&key.to_string()).await? else {
            return Ok(None);
        };

        let fire_at = raw
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);
        if fire_at.is_none() {
            warn!(key = %key, value = %raw, "Ignoring unreadable schedule marker");
        }
        Ok(fire_at)
    }

    pub async fn write(&self, key: &ScheduleKey, fire_at: DateTime<Utc>) -> Result<()> {
        self.store
            .set(&key.to_string(), &fire_at.timestamp_millis().to_string())
            .await
    }

    pub async fn clear(&self, key: &ScheduleKey) -> Result<()> {
        self.store.delete(&key.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prtrigger_db::MemoryStateStore;

    #[tokio::test]
    async fn test_marker_round_trips_fire_time() {
        let markers = PendingMarkers::new(Arc::new(MemoryStateStore::new()));
        let key = ScheduleKey::new("repo-a", 7);
        let fire_at = DateTime::from_timestamp_millis(1_700_000_030_000).unwrap();

        markers.write(&key, fire_at).await.unwrap();
        assert_eq!(markers.read(&key).await.unwrap(), Some(fire_at));

        markers.clear(&key).await.unwrap();
        assert_eq!(markers.read(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_marker_reads_as_absent() {
        let store = Arc::new(MemoryStateStore::new());
        store.set("schedule:repo-a:7", "not-a-time").await.unwrap();

        let markers = PendingMarkers::new(store);
        let key = ScheduleKey::new("repo-a", 7);
        assert_eq!(markers.read(&key).await.unwrap(), None);
    }
}
