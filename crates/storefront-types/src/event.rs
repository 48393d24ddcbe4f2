//! Realtime event payloads pushed to open streams.
//!
//! Every frame on the wire is `data: <json>\n\n` where the JSON object carries
//! a `type` discriminator. Room events also carry `roomId`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, RoomStatus};
use crate::principal::Role;

/// Events delivered over the support chat streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RealtimeEvent {
    /// First frame of every stream, naming the connection key it registered.
    Connected {
        connection_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Liveness frame sent to global streams.
    Heartbeat { timestamp: DateTime<Utc> },

    /// A message was committed to a room.
    NewMessage { room_id: i64, message: ChatMessage },

    /// A participant started or stopped typing.
    Typing {
        room_id: i64,
        user_id: i64,
        role: Role,
        is_typing: bool,
    },

    /// A participant read the other side's messages.
    MessagesRead {
        room_id: i64,
        reader_id: i64,
        reader_role: Role,
        count: u64,
    },

    /// A room was opened or closed.
    RoomStatus { room_id: i64, status: RoomStatus },
}

impl RealtimeEvent {
    pub fn heartbeat() -> Self {
        RealtimeEvent::Heartbeat {
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_wire_shape() {
        let json = serde_json::to_value(RealtimeEvent::heartbeat()).unwrap();
        assert_eq!(json["type"], "heartbeat");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_typing_uses_camel_case_fields() {
        let event = RealtimeEvent::Typing {
            room_id: 5,
            user_id: 1,
            role: Role::Customer,
            is_typing: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "typing");
        assert_eq!(json["roomId"], 5);
        assert_eq!(json["isTyping"], true);
    }

    #[test]
    fn test_messages_read_type_tag() {
        let event = RealtimeEvent::MessagesRead {
            room_id: 2,
            reader_id: 9,
            reader_role: Role::Admin,
            count: 4,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "messages_read");
        assert_eq!(json["readerRole"], "admin");
    }

    #[test]
    fn test_connected_wire_shape() {
        let event = RealtimeEvent::Connected {
            connection_id: "1-global".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["connectionId"], "1-global");
        assert!(json.get("roomId").is_none());
    }
}
