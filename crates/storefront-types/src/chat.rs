//! Support chat room and message types.
//!
//! A room is a conversation between one customer and the admin team.
//! Rooms and messages are durable; the realtime layer only forwards
//! notifications about rows that were already committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::principal::Role;

/// Lifecycle status of a chat room.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('open', 'closed'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Open,
    Closed,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStatus::Open => write!(f, "open"),
            RoomStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(RoomStatus::Open),
            "closed" => Ok(RoomStatus::Closed),
            other => Err(format!("invalid room status: '{other}'")),
        }
    }
}

/// A support conversation owned by a single customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: i64,
    pub customer_id: i64,
    pub subject: Option<String>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// A single message within a room, ordered by `created_at`.
///
/// `sender_role` decides which side sees the message as unread: a message
/// is unread for the opposite role until `read_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// A room as shown in a room list: unread count is relative to the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    #[serde(flatten)]
    pub room: ChatRoom,
    pub unread_count: u64,
    pub last_message: Option<ChatMessage>,
}
