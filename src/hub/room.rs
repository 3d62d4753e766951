//! A named broadcast scope: members plus bounded recent history.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use crate::domain::{ClientId, Message, RoomId, RoomProfile};

use super::connection::{Connection, ConnectionToken, EnqueueOutcome};

/// A room: membership map and history ring, each behind its own lock so
/// message-rate contention (history writes, membership reads) stays
/// independent of membership churn (membership writes).
///
/// Locks are only ever taken after the hub's registry lock and are never
/// held across an await point.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    profile: RwLock<RoomProfile>,
    members: RwLock<HashMap<ClientId, Connection>>,
    history: RwLock<VecDeque<Message>>,
    history_capacity: usize,
}

impl Room {
    pub fn new(profile: RoomProfile, history_capacity: usize) -> Self {
        Self {
            id: profile.id.clone(),
            profile: RwLock::new(profile),
            members: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Snapshot of the room's structural metadata.
    pub fn profile(&self) -> RoomProfile {
        self.profile.read().expect("room profile lock poisoned").clone()
    }

    /// Replace name/pin/topic metadata in place. Membership and history are
    /// untouched; the room id never changes.
    pub(crate) fn apply_profile(&self, mut profile: RoomProfile) {
        profile.id = self.id.clone();
        *self.profile.write().expect("room profile lock poisoned") = profile;
    }

    /// Insert a member, returning the connection it replaced when the client
    /// id was already present.
    pub(crate) fn add_member(&self, connection: Connection) -> Option<Connection> {
        let mut members = self.members.write().expect("room members lock poisoned");
        members.insert(connection.id().clone(), connection)
    }

    /// Remove a member, but only when the stored connection is the same
    /// instance the token identifies. Returns `None` when the id is unknown
    /// (duplicate removal) or when the entry belongs to a newer session
    /// (stale removal after a reconnect), making both a no-op.
    pub(crate) fn remove_member(
        &self,
        client_id: &ClientId,
        token: ConnectionToken,
    ) -> Option<Connection> {
        let mut members = self.members.write().expect("room members lock poisoned");
        match members.get(client_id) {
            Some(existing) if existing.token() == token => members.remove(client_id),
            _ => None,
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.read().expect("room members lock poisoned").len()
    }

    /// Append a message to history and fan it out to every current member.
    /// Returns the number of queues the message actually reached.
    ///
    /// Called only from the hub dispatch loop, so fan-outs for one room are
    /// totally ordered.
    pub(crate) fn broadcast(&self, message: &Message) -> usize {
        self.push_history(message.clone());

        let members = self.members.read().expect("room members lock poisoned");
        let mut delivered = 0;
        for (client_id, connection) in members.iter() {
            match connection.send(message.clone()) {
                EnqueueOutcome::Delivered => delivered += 1,
                EnqueueOutcome::Dropped => {
                    tracing::warn!(
                        room = %self.id,
                        client = %client_id,
                        "outbound queue full, dropping message for slow consumer"
                    );
                }
                EnqueueOutcome::Closed => {
                    tracing::debug!(
                        room = %self.id,
                        client = %client_id,
                        "outbound queue closed, member awaiting unregistration"
                    );
                }
            }
        }
        delivered
    }

    /// Copy of the history ring, oldest first.
    pub fn history_snapshot(&self) -> Vec<Message> {
        self.history
            .read()
            .expect("room history lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    fn push_history(&self, message: Message) {
        let mut history = self.history.write().expect("room history lock poisoned");
        if history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(message);
    }
}
