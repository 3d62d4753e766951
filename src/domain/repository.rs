//! Repository traits the hub depends on.
//!
//! The hub only ever talks to durable storage through these interfaces;
//! the infrastructure layer provides the implementations. All calls are
//! made from short-lived tasks off the dispatch loop, so they may block
//! on I/O freely.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::{Message, RoomId, RoomProfile};

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("room not found: {0}")]
    RoomNotFound(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Durable message storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Fetch up to `limit` of the most recent messages for a room, in
    /// chronological order (oldest first). `offset` skips that many of the
    /// newest messages, for paging backwards through history.
    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// Write a message durably. Returns the stored message with its
    /// creation timestamp assigned.
    async fn persist_message(&self, message: Message) -> Result<Message, RepositoryError>;
}

/// Per-user statistics and achievement storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn increment_message_count(&self, user_id: Uuid) -> Result<(), RepositoryError>;

    /// Re-evaluate achievements for a user after a stats change. Returns the
    /// names of any newly awarded achievements.
    async fn check_achievements(&self, user_id: Uuid) -> Result<Vec<String>, RepositoryError>;
}

/// Durable room catalog consumed by the lifecycle service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomCatalog: Send + Sync {
    /// Current set of pinned rooms (with topic metadata) that should exist
    /// in the hub registry.
    async fn pinned_rooms(&self) -> Result<Vec<RoomProfile>, RepositoryError>;

    /// Delete rooms whose expiry has passed. Returns the ids of the rooms
    /// that were removed, so the caller can evict them from the registry.
    async fn delete_expired(&self) -> Result<Vec<RoomId>, RepositoryError>;
}
