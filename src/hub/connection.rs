//! One client's registered presence in the hub.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::{ClientId, Message, RoomId};

/// Result of a non-blocking enqueue onto a connection's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The message was queued for delivery.
    Delivered,
    /// The queue was full; the message was dropped for this slow consumer.
    Dropped,
    /// The queue is closed (connection already torn down).
    Closed,
}

/// Identifies one connection *instance*, as opposed to the client id, which
/// survives reconnects. Unregistration is keyed by this token so a stale
/// teardown signal from a superseded session cannot evict the client's
/// live replacement connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionToken(Uuid);

impl ConnectionToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A client's live membership in a room: its identity plus the sending half
/// of its bounded outbound queue.
///
/// The hub stores the `Connection` in the room's membership map; the
/// receiving half lives with the socket's outbound write loop. Dropping the
/// `Connection` closes the queue, which is the cancellation signal for that
/// loop. Only the hub dispatch loop drops connections (on unregister, on
/// duplicate registration, or on room teardown), so a queue is never closed
/// twice.
#[derive(Debug)]
pub struct Connection {
    id: ClientId,
    room_id: RoomId,
    username: String,
    token: ConnectionToken,
    outbound: mpsc::Sender<Message>,
}

impl Connection {
    /// Create a connection together with the receiving half of its outbound
    /// queue. `capacity` bounds the queue; see [`EnqueueOutcome::Dropped`]
    /// for the overflow policy.
    pub fn channel(
        id: ClientId,
        room_id: RoomId,
        username: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Message>) {
        let (outbound, rx) = mpsc::channel(capacity);
        (
            Self {
                id,
                room_id,
                username: username.into(),
                token: ConnectionToken::generate(),
                outbound,
            },
            rx,
        )
    }

    /// Token of this connection instance; a reconnect with the same client
    /// id gets a different one.
    pub fn token(&self) -> ConnectionToken {
        self.token
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Enqueue a message without blocking. A full queue drops the message
    /// rather than stalling the caller: the dispatch loop must never wait on
    /// a slow consumer.
    pub fn send(&self, message: Message) -> EnqueueOutcome {
        match self.outbound.try_send(message) {
            Ok(()) => EnqueueOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => EnqueueOutcome::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => EnqueueOutcome::Closed,
        }
    }

    /// Weak handle on the queue's sending half, used by the history replay
    /// task. A weak handle does not keep the channel open: the queue still
    /// closes the instant the member entry owned by the room is dropped,
    /// even while a replay is mid-flight.
    pub(crate) fn queue(&self) -> mpsc::WeakSender<Message> {
        self.outbound.downgrade()
    }
}
