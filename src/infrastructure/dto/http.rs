//! DTOs for the read-only HTTP endpoints.

use serde::Serialize;

use crate::domain::Topic;
use crate::hub::Room;

/// Summary of one room as returned by `GET /api/rooms`.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub name: String,
    pub is_pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<TopicDto>,
    pub member_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicDto {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
}

impl From<&Topic> for TopicDto {
    fn from(topic: &Topic) -> Self {
        Self {
            title: topic.title.clone(),
            description: topic.description.clone(),
            url: topic.url.clone(),
            source: topic.source.clone(),
        }
    }
}

impl From<&Room> for RoomSummaryDto {
    fn from(room: &Room) -> Self {
        let profile = room.profile();
        Self {
            id: profile.id.as_str().to_string(),
            name: profile.name,
            is_pinned: profile.pinned,
            topic: profile.topic.as_ref().map(TopicDto::from),
            member_count: room.member_count(),
        }
    }
}
