//! Room lifecycle: periodic expiry sweep and pinned-room refresh.
//!
//! Runs on its own schedule, outside the hub's event channels, using the
//! same registry operations (`upsert_room` / `remove_room`) and therefore
//! the same two-level locking as live traffic.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{RepositoryError, RoomCatalog};
use crate::hub::HubHandle;

pub struct LifecycleService {
    hub: HubHandle,
    catalog: Arc<dyn RoomCatalog>,
}

impl LifecycleService {
    pub fn new(hub: HubHandle, catalog: Arc<dyn RoomCatalog>) -> Self {
        Self { hub, catalog }
    }

    /// Remove rooms whose expiry has passed, from durable storage and from
    /// the hub registry. Returns how many rooms were removed from storage.
    pub async fn expire_rooms(&self) -> Result<usize, RepositoryError> {
        let removed = self.catalog.delete_expired().await?;
        for room_id in &removed {
            if self.hub.remove_room(room_id) {
                tracing::info!(room = %room_id, "expired room removed");
            }
        }
        Ok(removed.len())
    }

    /// Make sure every pinned room in the catalog exists in the hub
    /// registry with up-to-date topic metadata. Existing rooms keep their
    /// members and history.
    pub async fn refresh_pinned_rooms(&self) -> Result<(), RepositoryError> {
        let pinned = self.catalog.pinned_rooms().await?;
        for profile in pinned {
            tracing::debug!(room = %profile.id, name = %profile.name, "pinned room refreshed");
            self.hub.upsert_room(profile);
        }
        Ok(())
    }

    /// Periodic driver: one expiry sweep plus one pinned refresh per tick.
    /// Failures are logged and the next tick retries from scratch.
    pub async fn run(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match self.expire_rooms().await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "expiry sweep removed rooms"),
                Err(error) => tracing::error!(%error, "expiry sweep failed"),
            }
            if let Err(error) = self.refresh_pinned_rooms().await {
                tracing::error!(%error, "pinned room refresh failed");
            }
        }
    }
}
