//! Domain model for the chat hub.
//!
//! Value objects (`RoomId`, `ClientId`, `Timestamp`), the `Message` entity,
//! room metadata, and the repository traits the hub depends on. Concrete
//! repository implementations live in the infrastructure layer (dependency
//! inversion: the domain defines the interfaces it needs).

mod message;
mod repository;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use message::{Message, SenderIdentity};
pub use repository::{MessageRepository, RepositoryError, RoomCatalog, StatsRepository};

#[cfg(test)]
pub use repository::{MockMessageRepository, MockRoomCatalog, MockStatsRepository};

/// Validation errors for domain value objects
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("room id must not be empty")]
    EmptyRoomId,
    #[error("client id must not be empty")]
    EmptyClientId,
}

/// Opaque room identifier, stable across the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.trim().is_empty() {
            return Err(DomainError::EmptyRoomId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque client identifier, unique within a room's membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: String) -> Result<Self, DomainError> {
        if value.trim().is_empty() {
            return Err(DomainError::EmptyClientId);
        }
        Ok(Self(value))
    }

    /// Generate a fresh random client id (used when the client supplies none).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix timestamp in milliseconds (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Topic metadata attached to pinned rooms by the lifecycle service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
}

/// Structural description of a room: everything about it except membership
/// and history. This is what the lifecycle service pushes into the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomProfile {
    pub id: RoomId,
    pub name: String,
    pub pinned: bool,
    pub topic: Option<Topic>,
}

impl RoomProfile {
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pinned: false,
            topic: None,
        }
    }

    pub fn pinned(id: RoomId, name: impl Into<String>, topic: Topic) -> Self {
        Self {
            id,
            name: name.into(),
            pinned: true,
            topic: Some(topic),
        }
    }
}
