//! In-memory implementations of the domain repository traits.
//!
//! Used by the standalone binary and the test suite. A SQL-backed
//! implementation would slot in behind the same traits without the hub
//! noticing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::common::time::{Clock, SystemClock};
use crate::domain::{
    Message, MessageRepository, RepositoryError, RoomCatalog, RoomId, RoomProfile,
    StatsRepository, Timestamp,
};

/// Message milestones that award an achievement, lowest first.
const MESSAGE_MILESTONES: &[(u64, &str)] = &[
    (1, "first-message"),
    (10, "getting-chatty"),
    (100, "regular"),
    (1000, "chatterbox"),
];

/// Messages per room, in insertion (chronological) order.
pub struct InMemoryMessageRepository {
    clock: Arc<dyn Clock>,
    messages: Mutex<HashMap<RoomId, Vec<Message>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            messages: Mutex::new(HashMap::new()),
        }
    }

    /// Total number of messages stored for a room.
    pub async fn message_count(&self, room_id: &RoomId) -> usize {
        let messages = self.messages.lock().await;
        messages.get(room_id).map_or(0, Vec::len)
    }
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.lock().await;
        let Some(room_messages) = messages.get(room_id) else {
            return Ok(Vec::new());
        };

        // Skip `offset` of the newest, then take up to `limit` of what
        // remains, still oldest-first.
        let end = room_messages.len().saturating_sub(offset);
        let start = end.saturating_sub(limit);
        Ok(room_messages[start..end].to_vec())
    }

    async fn persist_message(&self, message: Message) -> Result<Message, RepositoryError> {
        let stamped = message.with_created_at(Timestamp::new(self.clock.now_millis()));
        let mut messages = self.messages.lock().await;
        messages
            .entry(stamped.room_id.clone())
            .or_default()
            .push(stamped.clone());
        Ok(stamped)
    }
}

/// Per-user message counts and awarded achievements.
pub struct InMemoryStatsRepository {
    counts: Mutex<HashMap<Uuid, u64>>,
    awarded: Mutex<HashMap<Uuid, HashSet<String>>>,
}

impl InMemoryStatsRepository {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            awarded: Mutex::new(HashMap::new()),
        }
    }

    pub async fn message_count(&self, user_id: Uuid) -> u64 {
        let counts = self.counts.lock().await;
        counts.get(&user_id).copied().unwrap_or(0)
    }
}

impl Default for InMemoryStatsRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn increment_message_count(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        let mut counts = self.counts.lock().await;
        *counts.entry(user_id).or_insert(0) += 1;
        Ok(())
    }

    async fn check_achievements(&self, user_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let count = self.message_count(user_id).await;
        let mut awarded = self.awarded.lock().await;
        let user_awards = awarded.entry(user_id).or_default();

        let mut newly_awarded = Vec::new();
        for (milestone, name) in MESSAGE_MILESTONES {
            if count >= *milestone && user_awards.insert((*name).to_string()) {
                newly_awarded.push((*name).to_string());
            }
        }
        Ok(newly_awarded)
    }
}

/// Catalog of pinned rooms plus rooms explicitly marked expired.
pub struct InMemoryRoomCatalog {
    pinned: Mutex<Vec<RoomProfile>>,
    expired: Mutex<Vec<RoomId>>,
}

impl InMemoryRoomCatalog {
    pub fn new() -> Self {
        Self {
            pinned: Mutex::new(Vec::new()),
            expired: Mutex::new(Vec::new()),
        }
    }

    pub async fn set_pinned(&self, profiles: Vec<RoomProfile>) {
        *self.pinned.lock().await = profiles;
    }

    /// Mark a room as expired; the next `delete_expired` call removes it.
    pub async fn mark_expired(&self, room_id: RoomId) {
        self.expired.lock().await.push(room_id);
    }
}

impl Default for InMemoryRoomCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomCatalog for InMemoryRoomCatalog {
    async fn pinned_rooms(&self) -> Result<Vec<RoomProfile>, RepositoryError> {
        Ok(self.pinned.lock().await.clone())
    }

    async fn delete_expired(&self) -> Result<Vec<RoomId>, RepositoryError> {
        let mut expired = self.expired.lock().await;
        let removed: Vec<RoomId> = expired.drain(..).collect();

        // Expired pinned rooms also leave the catalog.
        let mut pinned = self.pinned.lock().await;
        pinned.retain(|profile| !removed.contains(&profile.id));

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::FixedClock;

    fn room_id(value: &str) -> RoomId {
        RoomId::new(value.to_string()).unwrap()
    }

    fn message(room: &str, content: &str) -> Message {
        Message::user(content, room_id(room), "alice", None)
    }

    #[tokio::test]
    async fn test_persist_message_assigns_timestamp() {
        // given:
        let repo = InMemoryMessageRepository::with_clock(Arc::new(FixedClock::new(42)));

        // when:
        let stored = repo.persist_message(message("r1", "hi")).await.unwrap();

        // then:
        assert_eq!(stored.created_at, Some(Timestamp::new(42)));
        assert_eq!(repo.message_count(&room_id("r1")).await, 1);
    }

    #[tokio::test]
    async fn test_recent_messages_returns_newest_in_chronological_order() {
        // given: five persisted messages
        let repo = InMemoryMessageRepository::new();
        for i in 1..=5 {
            repo.persist_message(message("r1", &format!("m{i}")))
                .await
                .unwrap();
        }

        // when: fetch the latest three
        let recent = repo.recent_messages(&room_id("r1"), 3, 0).await.unwrap();

        // then: oldest-first among the newest three
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5"]);
    }

    #[tokio::test]
    async fn test_recent_messages_with_offset() {
        // given:
        let repo = InMemoryMessageRepository::new();
        for i in 1..=5 {
            repo.persist_message(message("r1", &format!("m{i}")))
                .await
                .unwrap();
        }

        // when: skip the two newest, then take two
        let page = repo.recent_messages(&room_id("r1"), 2, 2).await.unwrap();

        // then:
        let contents: Vec<&str> = page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3"]);
    }

    #[tokio::test]
    async fn test_recent_messages_for_unknown_room_is_empty() {
        // given:
        let repo = InMemoryMessageRepository::new();

        // when / then:
        let recent = repo.recent_messages(&room_id("nope"), 100, 0).await.unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn test_stats_increment_and_first_achievement() {
        // given:
        let repo = InMemoryStatsRepository::new();
        let user = Uuid::new_v4();

        // when:
        repo.increment_message_count(user).await.unwrap();
        let awarded = repo.check_achievements(user).await.unwrap();

        // then:
        assert_eq!(repo.message_count(user).await, 1);
        assert_eq!(awarded, vec!["first-message".to_string()]);
    }

    #[tokio::test]
    async fn test_achievements_are_awarded_once() {
        // given: an already-awarded milestone
        let repo = InMemoryStatsRepository::new();
        let user = Uuid::new_v4();
        repo.increment_message_count(user).await.unwrap();
        repo.check_achievements(user).await.unwrap();

        // when:
        repo.increment_message_count(user).await.unwrap();
        let awarded = repo.check_achievements(user).await.unwrap();

        // then: nothing new until the next milestone
        assert!(awarded.is_empty());
    }

    #[tokio::test]
    async fn test_delete_expired_drains_marked_rooms() {
        // given:
        let catalog = InMemoryRoomCatalog::new();
        catalog
            .set_pinned(vec![RoomProfile::new(room_id("pinned"), "Pinned")])
            .await;
        catalog.mark_expired(room_id("pinned")).await;
        catalog.mark_expired(room_id("other")).await;

        // when:
        let removed = catalog.delete_expired().await.unwrap();

        // then: both gone, catalog pruned, second sweep removes nothing
        assert_eq!(removed.len(), 2);
        assert!(catalog.pinned_rooms().await.unwrap().is_empty());
        assert!(catalog.delete_expired().await.unwrap().is_empty());
    }
}
