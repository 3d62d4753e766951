//! The connection registry and broadcast hub.
//!
//! A singleton dispatch loop ([`Hub::run`]) serializes all room-membership
//! and history mutation, consuming registration, unregistration, and
//! broadcast events from three channels. Rooms live in a registry behind a
//! registry-level lock; each room guards its own membership and history
//! (two-level locking, registry before room, so unrelated rooms never
//! contend). Persistence and history replay run on short-lived tasks off
//! the loop, which therefore never blocks on I/O.

mod connection;
mod core;
mod room;

pub use self::connection::{Connection, ConnectionToken, EnqueueOutcome};
pub use self::core::{Departure, Hub, HubError, HubHandle};
pub use self::room::Room;
