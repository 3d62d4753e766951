//! Wire format for messages delivered over a WebSocket.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Message;

/// One delivered unit on the outbound stream.
///
/// Field names match the persisted message record so clients see a single
/// schema; `user_id` is omitted for anonymous and system senders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub content: String,
    pub room_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub system: bool,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            room_id: message.room_id.as_str().to_string(),
            username: message.username.clone(),
            user_id: message.user_id,
            system: message.system,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoomId;

    #[test]
    fn test_wire_message_serialization() {
        // given:
        let room_id = RoomId::new("r1".to_string()).unwrap();
        let message = Message::user("hi", room_id, "alice", None);

        // when:
        let json = serde_json::to_string(&WireMessage::from(&message)).unwrap();

        // then: anonymous sender omits user_id entirely
        assert_eq!(
            json,
            r#"{"content":"hi","room_id":"r1","username":"alice","system":false}"#
        );
    }

    #[test]
    fn test_wire_message_includes_user_id_when_present() {
        // given:
        let room_id = RoomId::new("r1".to_string()).unwrap();
        let user_id = Uuid::new_v4();
        let message = Message::user("hi", room_id, "alice", Some(user_id));

        // when:
        let wire = WireMessage::from(&message);
        let json = serde_json::to_string(&wire).unwrap();

        // then:
        assert!(json.contains(&user_id.to_string()));
        let parsed: WireMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, wire);
    }

    #[test]
    fn test_system_message_flag_survives_conversion() {
        // given:
        let room_id = RoomId::new("r1".to_string()).unwrap();
        let message = Message::system("alice joined", room_id);

        // when:
        let wire = WireMessage::from(&message);

        // then:
        assert!(wire.system);
        assert_eq!(wire.username, "");
    }
}
