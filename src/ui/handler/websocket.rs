//! WebSocket connection handler: upgrade, read loop, write loop, teardown.

use std::sync::Arc;

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message as WsFrame, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::domain::{ClientId, Message, RoomId, SenderIdentity};
use crate::hub::{Connection, HubHandle};
use crate::infrastructure::dto::websocket::WireMessage;

use super::super::state::{AppState, ConnectQuery};

/// `GET /ws/{room_id}` — upgrade to a WebSocket and join the room.
///
/// The room must already exist: joining an unknown room is a 404 rather
/// than an implicit room creation. Identity comes in as explicit query
/// parameters (threaded through from the auth layer), never from ambient
/// request context.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let room_id = RoomId::new(room_id).map_err(|_| StatusCode::BAD_REQUEST)?;
    if state.hub.room(&room_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let client_id = match query.client_id {
        Some(raw) => ClientId::new(raw).map_err(|_| StatusCode::BAD_REQUEST)?,
        None => ClientId::generate(),
    };
    let username = query
        .username
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "Anonymous".to_string());
    let identity = SenderIdentity {
        client_id,
        username,
        user_id: query.user_id,
    };

    tracing::info!(room = %room_id, client = %identity.client_id, "websocket connecting");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, identity)))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    room_id: RoomId,
    identity: SenderIdentity,
) {
    let (connection, outbound_rx) = Connection::channel(
        identity.client_id.clone(),
        room_id.clone(),
        identity.username.clone(),
        state.outbound_queue_capacity,
    );
    // Keyed teardown: if this client reconnects while we are still winding
    // down, our unregister must not evict the replacement session.
    let token = connection.token();

    if state.hub.register(connection).await.is_err() {
        tracing::error!(room = %room_id, "hub is down, refusing websocket session");
        return;
    }

    let (ws_sender, ws_receiver) = socket.split();

    let mut write_task = tokio::spawn(outbound_loop(ws_sender, outbound_rx));
    let mut read_task = tokio::spawn(inbound_loop(
        ws_receiver,
        state.hub.clone(),
        room_id.clone(),
        identity.clone(),
    ));

    // Whichever loop finishes first tears the other down. The read loop is
    // the teardown authority: socket errors and closes surface there.
    tokio::select! {
        _ = &mut read_task => write_task.abort(),
        _ = &mut write_task => read_task.abort(),
    }

    if state
        .hub
        .unregister(room_id.clone(), identity.client_id.clone(), token)
        .await
        .is_err()
    {
        tracing::warn!(room = %room_id, client = %identity.client_id, "hub is down during unregister");
    }
    tracing::info!(room = %room_id, client = %identity.client_id, "websocket session ended");
}

/// Pull from the connection's outbound queue and serialize each message to
/// the wire. A closed queue (hub unregistered us) ends the loop cleanly.
async fn outbound_loop(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, WsFrame>,
    mut outbound_rx: mpsc::Receiver<Message>,
) {
    while let Some(message) = outbound_rx.recv().await {
        let wire = WireMessage::from(&message);
        let json = match serde_json::to_string(&wire) {
            Ok(json) => json,
            Err(error) => {
                tracing::error!(%error, "failed to serialize outbound message");
                continue;
            }
        };
        if ws_sender.send(WsFrame::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Read frames from the socket and submit them to the hub as broadcasts,
/// stamped with this connection's room and identity. Malformed frames are
/// dropped per-frame; a read error or close ends the loop and, through the
/// caller, triggers unregistration.
async fn inbound_loop(
    mut ws_receiver: futures_util::stream::SplitStream<WebSocket>,
    hub: HubHandle,
    room_id: RoomId,
    identity: SenderIdentity,
) {
    while let Some(frame) = ws_receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(error) => {
                tracing::debug!(room = %room_id, client = %identity.client_id, %error, "websocket read error");
                break;
            }
        };

        match frame {
            WsFrame::Text(text) => {
                let content = text.to_string();
                if content.trim().is_empty() {
                    continue;
                }
                let message = Message::user(
                    content,
                    room_id.clone(),
                    identity.username.clone(),
                    identity.user_id,
                );
                if hub.broadcast(message).await.is_err() {
                    break;
                }
            }
            WsFrame::Close(_) => {
                tracing::debug!(room = %room_id, client = %identity.client_id, "client closed websocket");
                break;
            }
            // Ping/pong are answered by axum; binary frames are not part of
            // the protocol and are dropped.
            _ => {}
        }
    }
}
