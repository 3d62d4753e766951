//! The serialized hub event loop and its handle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};

use crate::config::HubConfig;
use crate::domain::{
    ClientId, Message, MessageRepository, RoomId, RoomProfile, StatsRepository,
};

use super::connection::{Connection, ConnectionToken};
use super::room::Room;

/// Room id → room, behind the registry-level lock. Per-room locks are only
/// taken after this one (lock order: registry, then room).
type Registry = Arc<RwLock<HashMap<RoomId, Arc<Room>>>>;

/// An unregistration event: which connection instance is leaving which
/// room. The token keys the removal to one session, so a superseded
/// session's teardown cannot evict the reconnected replacement.
#[derive(Debug, Clone)]
pub struct Departure {
    pub room_id: RoomId,
    pub client_id: ClientId,
    pub token: ConnectionToken,
}

#[derive(Debug, Error)]
pub enum HubError {
    /// The dispatch loop has stopped and no longer accepts events.
    #[error("hub dispatch loop is not running")]
    Stopped,
}

/// Cloneable handle for submitting events to the hub and for the structural
/// registry operations the lifecycle service performs outside the event
/// channels.
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<Connection>,
    unregister_tx: mpsc::Sender<Departure>,
    broadcast_tx: mpsc::Sender<Message>,
    registry: Registry,
    history_capacity: usize,
}

impl HubHandle {
    /// Submit a connection for registration into its room.
    pub async fn register(&self, connection: Connection) -> Result<(), HubError> {
        self.register_tx
            .send(connection)
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Signal that one connection instance has left its room.
    pub async fn unregister(
        &self,
        room_id: RoomId,
        client_id: ClientId,
        token: ConnectionToken,
    ) -> Result<(), HubError> {
        self.unregister_tx
            .send(Departure {
                room_id,
                client_id,
                token,
            })
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Submit a message for fan-out to its room.
    pub async fn broadcast(&self, message: Message) -> Result<(), HubError> {
        self.broadcast_tx
            .send(message)
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Insert a room, or update an existing room's metadata in place
    /// (membership and history are preserved).
    pub fn upsert_room(&self, profile: RoomProfile) {
        let mut registry = self.registry.write().expect("room registry lock poisoned");
        match registry.get(&profile.id) {
            Some(room) => room.apply_profile(profile),
            None => {
                let id = profile.id.clone();
                registry.insert(id, Arc::new(Room::new(profile, self.history_capacity)));
            }
        }
    }

    /// Tear a room down. Dropping the room drops every member connection,
    /// which closes their outbound queues and ends their write loops.
    pub fn remove_room(&self, room_id: &RoomId) -> bool {
        let mut registry = self.registry.write().expect("room registry lock poisoned");
        registry.remove(room_id).is_some()
    }

    pub fn room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        lookup(&self.registry, room_id)
    }

    /// Snapshot of all rooms, in no particular order.
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        self.registry
            .read()
            .expect("room registry lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

/// The hub: owns the receiving ends of the three event channels and runs the
/// singleton dispatch loop.
pub struct Hub {
    registry: Registry,
    messages: Arc<dyn MessageRepository>,
    stats: Arc<dyn StatsRepository>,
    /// Caps concurrently running persistence side-effect tasks.
    persist_limit: Arc<Semaphore>,
    history_capacity: usize,
    register_rx: mpsc::Receiver<Connection>,
    unregister_rx: mpsc::Receiver<Departure>,
    broadcast_rx: mpsc::Receiver<Message>,
}

impl Hub {
    pub fn new(
        config: &HubConfig,
        messages: Arc<dyn MessageRepository>,
        stats: Arc<dyn StatsRepository>,
    ) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::channel(config.event_queue_capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(config.event_queue_capacity);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(config.event_queue_capacity);
        let registry: Registry = Arc::new(RwLock::new(HashMap::new()));

        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            registry: Arc::clone(&registry),
            history_capacity: config.history_capacity,
        };

        let hub = Self {
            registry,
            messages,
            stats,
            persist_limit: Arc::new(Semaphore::new(config.persist_concurrency)),
            history_capacity: config.history_capacity,
            register_rx,
            unregister_rx,
            broadcast_rx,
        };

        (hub, handle)
    }

    /// Run the dispatch loop until every handle has been dropped.
    ///
    /// One iteration handles exactly one event; iterations never overlap,
    /// which is what makes room mutation race-free without a global lock
    /// across all rooms. When more than one channel is ready, `select!`
    /// picks a branch pseudo-randomly; no priority among the three event
    /// classes is intended.
    pub async fn run(mut self) {
        tracing::info!("hub dispatch loop started");
        loop {
            tokio::select! {
                Some(connection) = self.register_rx.recv() => self.handle_register(connection),
                Some(departure) = self.unregister_rx.recv() => self.handle_unregister(departure),
                Some(message) = self.broadcast_rx.recv() => self.handle_broadcast(message),
                else => break,
            }
        }
        tracing::info!("hub dispatch loop stopped");
    }

    fn handle_register(&self, connection: Connection) {
        let room_id = connection.room_id().clone();
        let client_id = connection.id().clone();

        let Some(room) = lookup(&self.registry, &room_id) else {
            // The room must exist before a client connects; a miss here is
            // a transient race with room teardown, not an error to retry.
            tracing::warn!(
                room = %room_id,
                client = %client_id,
                "dropping registration for unknown room"
            );
            return;
        };

        let replay_queue = connection.queue();
        if let Some(superseded) = room.add_member(connection) {
            // Same client id registered again: the new entry wins and the
            // superseded queue is closed here so its write loop terminates
            // instead of leaking.
            tracing::warn!(
                room = %room_id,
                client = %client_id,
                "duplicate registration, closing superseded connection"
            );
            drop(superseded);
        }
        tracing::debug!(room = %room_id, client = %client_id, "client registered");

        // History replay needs an I/O round-trip, so it runs off the loop.
        // The task holds only a weak queue handle, upgraded per send: when
        // the member is dropped mid-replay the queue closes at once and the
        // task winds down instead of keeping the channel alive.
        let messages = Arc::clone(&self.messages);
        let limit = self.history_capacity;
        tokio::spawn(async move {
            match messages.recent_messages(&room_id, limit, 0).await {
                Ok(history) => {
                    for message in history {
                        let Some(queue) = replay_queue.upgrade() else {
                            // Joiner disconnected mid-replay.
                            return;
                        };
                        if queue.send(message).await.is_err() {
                            return;
                        }
                    }
                }
                Err(error) => {
                    tracing::error!(room = %room_id, %error, "history replay fetch failed");
                }
            }
        });
    }

    fn handle_unregister(&self, departure: Departure) {
        let Some(room) = lookup(&self.registry, &departure.room_id) else {
            tracing::debug!(
                room = %departure.room_id,
                client = %departure.client_id,
                "unregister for unknown room (already torn down)"
            );
            return;
        };

        match room.remove_member(&departure.client_id, departure.token) {
            Some(connection) => {
                // Sole authorized close of the outbound queue.
                drop(connection);
                tracing::debug!(
                    room = %departure.room_id,
                    client = %departure.client_id,
                    "client unregistered"
                );
            }
            None => {
                // Either a duplicate signal or a stale one from a session
                // that a reconnect has already superseded.
                tracing::debug!(
                    room = %departure.room_id,
                    client = %departure.client_id,
                    "unregister without matching connection ignored"
                );
            }
        }
    }

    fn handle_broadcast(&self, message: Message) {
        let Some(room) = lookup(&self.registry, &message.room_id) else {
            tracing::warn!(room = %message.room_id, "dropping broadcast for unknown room");
            return;
        };

        // In-memory delivery first: history append plus fan-out, both
        // synchronous, so every member of this room observes the same order.
        let delivered = room.broadcast(&message);
        tracing::debug!(room = %message.room_id, delivered, "message broadcast");

        // Durability is best-effort and must not block or unwind delivery.
        self.spawn_persist(message);
    }

    fn spawn_persist(&self, message: Message) {
        let messages = Arc::clone(&self.messages);
        let stats = Arc::clone(&self.stats);
        let limiter = Arc::clone(&self.persist_limit);

        tokio::spawn(async move {
            let _permit = match limiter.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let room_id = message.room_id.clone();
            let user_id = message.user_id;

            let persisted = match messages.persist_message(message).await {
                Ok(persisted) => persisted,
                Err(error) => {
                    tracing::error!(room = %room_id, %error, "message persistence failed");
                    return;
                }
            };
            tracing::debug!(
                room = %room_id,
                created_at = ?persisted.created_at,
                "message persisted"
            );

            // Stats and achievements only apply to authenticated senders,
            // and achievements are only re-evaluated after a successful
            // count increment.
            let Some(user_id) = user_id else { return };
            if let Err(error) = stats.increment_message_count(user_id).await {
                tracing::error!(%user_id, %error, "message count increment failed");
                return;
            }
            match stats.check_achievements(user_id).await {
                Ok(awarded) if !awarded.is_empty() => {
                    tracing::info!(%user_id, ?awarded, "achievements awarded");
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::error!(%user_id, %error, "achievement check failed");
                }
            }
        });
    }
}

fn lookup(registry: &Registry, room_id: &RoomId) -> Option<Arc<Room>> {
    registry
        .read()
        .expect("room registry lock poisoned")
        .get(room_id)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MockMessageRepository, MockStatsRepository};

    fn strict_hub() -> (Hub, HubHandle) {
        // Strict mocks: any repository call without an expectation panics,
        // so these tests double as "no side effect happened" assertions.
        let messages = Arc::new(MockMessageRepository::new());
        let stats = Arc::new(MockStatsRepository::new());
        Hub::new(&HubConfig::default(), messages, stats)
    }

    fn hub_with_empty_history() -> (Hub, HubHandle) {
        let mut messages = MockMessageRepository::new();
        messages
            .expect_recent_messages()
            .returning(|_, _, _| Ok(Vec::new()));
        let stats = MockStatsRepository::new();
        Hub::new(&HubConfig::default(), Arc::new(messages), Arc::new(stats))
    }

    fn room_id(value: &str) -> RoomId {
        RoomId::new(value.to_string()).unwrap()
    }

    fn client_id(value: &str) -> ClientId {
        ClientId::new(value.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_register_to_unknown_room_is_dropped() {
        // given: an empty registry and strict mocks
        let (hub, _handle) = strict_hub();
        let (connection, mut rx) =
            Connection::channel(client_id("alice"), room_id("missing"), "Alice", 16);

        // when:
        hub.handle_register(connection);

        // then: no membership anywhere, queue closed, no replay fetch
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_to_unknown_room_is_dropped() {
        // given:
        let (hub, _handle) = strict_hub();

        // when: must not panic and must not touch the repositories
        hub.handle_broadcast(Message::user("hi", room_id("missing"), "alice", None));
    }

    #[tokio::test]
    async fn test_duplicate_registration_closes_superseded_queue() {
        // given: a room with alice already registered
        let (hub, handle) = hub_with_empty_history();
        handle.upsert_room(RoomProfile::new(room_id("r1"), "Room One"));
        let (first, mut first_rx) =
            Connection::channel(client_id("alice"), room_id("r1"), "Alice", 16);
        let (second, _second_rx) =
            Connection::channel(client_id("alice"), room_id("r1"), "Alice", 16);
        hub.handle_register(first);

        // when: the same client id registers again
        hub.handle_register(second);

        // then: still one member, and the first queue has been closed
        let room = handle.room(&room_id("r1")).unwrap();
        assert_eq!(room.member_count(), 1);
        assert!(first_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unregister_twice_is_noop() {
        // given: alice registered in r1
        let (hub, handle) = hub_with_empty_history();
        handle.upsert_room(RoomProfile::new(room_id("r1"), "Room One"));
        let (connection, mut rx) =
            Connection::channel(client_id("alice"), room_id("r1"), "Alice", 16);
        let token = connection.token();
        hub.handle_register(connection);

        let departure = Departure {
            room_id: room_id("r1"),
            client_id: client_id("alice"),
            token,
        };

        // when:
        hub.handle_unregister(departure.clone());
        hub.handle_unregister(departure);

        // then: no panic, queue closed exactly once, membership empty
        assert!(rx.recv().await.is_none());
        let room = handle.room(&room_id("r1")).unwrap();
        assert_eq!(room.member_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_unregister_does_not_evict_reconnected_client() {
        // given: alice registered, then reconnected under the same client id
        let (hub, handle) = hub_with_empty_history();
        handle.upsert_room(RoomProfile::new(room_id("r1"), "Room One"));
        let (first, _first_rx) =
            Connection::channel(client_id("alice"), room_id("r1"), "Alice", 16);
        let (second, mut second_rx) =
            Connection::channel(client_id("alice"), room_id("r1"), "Alice", 16);
        let first_token = first.token();
        hub.handle_register(first);
        hub.handle_register(second);

        // when: the superseded session's teardown signal arrives late, as it
        // does when its socket handler unwinds after the reconnect
        hub.handle_unregister(Departure {
            room_id: room_id("r1"),
            client_id: client_id("alice"),
            token: first_token,
        });

        // then: the live session is still a member and still reachable
        let room = handle.room(&room_id("r1")).unwrap();
        assert_eq!(room.member_count(), 1);
        room.broadcast(&Message::user("still here", room_id("r1"), "alice", None));
        assert_eq!(second_rx.recv().await.unwrap().content, "still here");
    }

    #[tokio::test]
    async fn test_upsert_existing_room_preserves_members() {
        // given:
        let (hub, handle) = hub_with_empty_history();
        handle.upsert_room(RoomProfile::new(room_id("r1"), "Room One"));
        let (connection, _rx) =
            Connection::channel(client_id("alice"), room_id("r1"), "Alice", 16);
        hub.handle_register(connection);

        // when:
        handle.upsert_room(RoomProfile::new(room_id("r1"), "Renamed"));

        // then:
        let room = handle.room(&room_id("r1")).unwrap();
        assert_eq!(room.profile().name, "Renamed");
        assert_eq!(room.member_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_room_closes_member_queues() {
        // given:
        let (hub, handle) = hub_with_empty_history();
        handle.upsert_room(RoomProfile::new(room_id("r1"), "Room One"));
        let (connection, mut rx) =
            Connection::channel(client_id("alice"), room_id("r1"), "Alice", 16);
        hub.handle_register(connection);

        // when: the lifecycle service tears the room down
        assert!(handle.remove_room(&room_id("r1")));

        // then: alice's queue closes, and removing again reports absence
        assert!(rx.recv().await.is_none());
        assert!(!handle.remove_room(&room_id("r1")));
    }
}
