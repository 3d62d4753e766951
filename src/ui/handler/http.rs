//! Read-only HTTP endpoints.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::infrastructure::dto::http::RoomSummaryDto;

use super::super::state::AppState;

/// `GET /api/health`
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// `GET /api/rooms` — snapshot of the live room registry.
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state
        .hub
        .rooms()
        .iter()
        .map(|room| RoomSummaryDto::from(room.as_ref()))
        .collect();
    Json(rooms)
}
