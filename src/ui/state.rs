//! Shared state and request types for the HTTP/WebSocket surface.

use serde::Deserialize;
use uuid::Uuid;

use crate::hub::HubHandle;

/// Shared application state handed to every handler.
pub struct AppState {
    pub hub: HubHandle,
    /// Capacity for each new connection's outbound queue.
    pub outbound_queue_capacity: usize,
}

/// Query parameters accepted by the WebSocket connect endpoint.
///
/// `client_id` is generated when absent; `username` defaults to
/// "Anonymous"; `user_id` is the authenticated identity passed through
/// explicitly by the auth layer in front of us.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<Uuid>,
}
