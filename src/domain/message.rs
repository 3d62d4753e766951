//! The chat message entity.

use uuid::Uuid;

use super::{ClientId, RoomId, Timestamp};

/// A single chat message.
///
/// Immutable once constructed; flows by value through the hub's channels and
/// each connection's outbound queue. `created_at` is assigned by the
/// persistence layer, not at broadcast time, so a message that has not been
/// persisted yet carries `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub content: String,
    pub room_id: RoomId,
    pub username: String,
    pub user_id: Option<Uuid>,
    pub system: bool,
    pub created_at: Option<Timestamp>,
}

impl Message {
    /// A message typed by a user on a live connection.
    pub fn user(
        content: impl Into<String>,
        room_id: RoomId,
        username: impl Into<String>,
        user_id: Option<Uuid>,
    ) -> Self {
        Self {
            content: content.into(),
            room_id,
            username: username.into(),
            user_id,
            system: false,
            created_at: None,
        }
    }

    /// A server-generated announcement (joins, leaves, room notices).
    pub fn system(content: impl Into<String>, room_id: RoomId) -> Self {
        Self {
            content: content.into(),
            room_id,
            username: String::new(),
            user_id: None,
            system: true,
            created_at: None,
        }
    }

    /// Copy of this message with its persistence timestamp set.
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Identity a sender presents when connecting: display name plus an optional
/// authenticated user id. Threaded explicitly through the connect path
/// rather than stashed in request context.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub client_id: ClientId,
    pub username: String,
    pub user_id: Option<Uuid>,
}
