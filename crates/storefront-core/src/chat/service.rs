//! Chat service: room access, message persistence, and realtime notification.
//!
//! Every mutating operation commits to the repository first and broadcasts
//! afterwards. Broadcast results are logged and never turn a committed write
//! into an error.

use chrono::Utc;
use serde_json::Value;
use storefront_types::chat::{ChatMessage, ChatRoom, RoomStatus, RoomSummary};
use storefront_types::error::ChatError;
use storefront_types::event::RealtimeEvent;
use storefront_types::principal::{Principal, Role};
use tracing::{debug, info, warn};

use crate::chat::repository::ChatRepository;
use crate::realtime::dispatcher::{BroadcastReport, Broadcaster};

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Longest accepted room subject, in characters.
pub const MAX_SUBJECT_LEN: usize = 200;

/// Orchestrates support rooms, messages, and their realtime events.
///
/// Generic over `ChatRepository` to keep storefront-core free of any
/// storage dependency.
pub struct ChatService<C: ChatRepository> {
    chat_repo: C,
    broadcaster: Broadcaster,
}

impl<C: ChatRepository> ChatService<C> {
    pub fn new(chat_repo: C, broadcaster: Broadcaster) -> Self {
        Self {
            chat_repo,
            broadcaster,
        }
    }

    pub fn chat_repo(&self) -> &C {
        &self.chat_repo
    }

    // --- Rooms ---

    /// Return the customer's open room, creating one if none exists.
    pub async fn open_room(
        &self,
        principal: &Principal,
        subject: Option<&str>,
    ) -> Result<ChatRoom, ChatError> {
        if principal.role != Role::Customer {
            return Err(ChatError::NotCustomer);
        }

        let subject = normalize_subject(subject)?;
        let (room, created) = self
            .chat_repo
            .find_or_create_open_room(principal.user_id, subject.as_deref(), Utc::now())
            .await?;
        if created {
            info!(room_id = room.id, customer_id = principal.user_id, "support room opened");
        } else {
            debug!(room_id = room.id, customer_id = principal.user_id, "reusing open room");
        }
        Ok(room)
    }

    /// Load a room and check that `principal` may access it.
    ///
    /// Admins may access every room; customers only their own.
    pub async fn authorize_room(
        &self,
        principal: &Principal,
        room_id: i64,
    ) -> Result<ChatRoom, ChatError> {
        let room = self
            .chat_repo
            .get_room(room_id)
            .await?
            .ok_or(ChatError::RoomNotFound(room_id))?;

        if principal.is_admin() || room.customer_id == principal.user_id {
            Ok(room)
        } else {
            Err(ChatError::Forbidden(room_id))
        }
    }

    /// Rooms visible to `principal`, with unread counts from their side.
    pub async fn list_rooms(&self, principal: &Principal) -> Result<Vec<RoomSummary>, ChatError> {
        let filter = (!principal.is_admin()).then_some(principal.user_id);
        let rooms = self.chat_repo.list_rooms(filter).await?;

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let unread_count = self.chat_repo.count_unread(room.id, principal.role).await?;
            let last_message = self.chat_repo.last_message(room.id).await?;
            summaries.push(RoomSummary {
                room,
                unread_count,
                last_message,
            });
        }
        Ok(summaries)
    }

    /// Open or close a room. Admins and the owning customer may do this.
    pub async fn set_room_status(
        &self,
        principal: &Principal,
        room_id: i64,
        status: RoomStatus,
    ) -> Result<ChatRoom, ChatError> {
        let mut room = self.authorize_room(principal, room_id).await?;
        if room.status == status {
            return Ok(room);
        }

        let now = Utc::now();
        self.chat_repo.update_room_status(room_id, status, now).await?;
        room.status = status;
        room.updated_at = now;
        info!(room_id, %status, by = principal.user_id, "room status changed");

        self.notify(&room, &RealtimeEvent::RoomStatus { room_id, status });
        Ok(room)
    }

    // --- Messages ---

    /// Messages of a room the principal may access.
    pub async fn get_messages(
        &self,
        principal: &Principal,
        room_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.authorize_room(principal, room_id).await?;
        Ok(self.chat_repo.get_messages(room_id, limit, offset).await?)
    }

    /// Persist a message, then broadcast it as `new_message`.
    pub async fn send_message(
        &self,
        principal: &Principal,
        room_id: i64,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        let content = normalize_content(content)?;
        let room = self.authorize_room(principal, room_id).await?;
        if room.status == RoomStatus::Closed {
            return Err(ChatError::RoomClosed(room_id));
        }

        let message = self
            .chat_repo
            .save_message(room_id, principal.user_id, principal.role, &content, Utc::now())
            .await?;

        let report = self.notify(
            &room,
            &RealtimeEvent::NewMessage {
                room_id,
                message: message.clone(),
            },
        );
        info!(
            room_id,
            message_id = message.id,
            delivered = report.delivered(),
            "message sent"
        );
        Ok(message)
    }

    /// Broadcast a typing indicator. Nothing is persisted.
    pub async fn send_typing(
        &self,
        principal: &Principal,
        room_id: i64,
        is_typing: bool,
    ) -> Result<BroadcastReport, ChatError> {
        let room = self.authorize_room(principal, room_id).await?;
        Ok(self.notify(
            &room,
            &RealtimeEvent::Typing {
                room_id,
                user_id: principal.user_id,
                role: principal.role,
                is_typing,
            },
        ))
    }

    /// Mark the other side's messages read and broadcast `messages_read`.
    ///
    /// Returns the number of messages that changed state.
    pub async fn mark_read(&self, principal: &Principal, room_id: i64) -> Result<u64, ChatError> {
        let room = self.authorize_room(principal, room_id).await?;
        let count = self
            .chat_repo
            .mark_read(room_id, principal.role, Utc::now())
            .await?;

        if count > 0 {
            self.notify(
                &room,
                &RealtimeEvent::MessagesRead {
                    room_id,
                    reader_id: principal.user_id,
                    reader_role: principal.role,
                    count,
                },
            );
        }
        Ok(count)
    }

    /// Forward an arbitrary payload to a room's listeners.
    ///
    /// Backs the internal broadcast trigger endpoint.
    pub async fn relay(&self, room_id: i64, data: &Value) -> Result<BroadcastReport, ChatError> {
        let room = self
            .chat_repo
            .get_room(room_id)
            .await?
            .ok_or(ChatError::RoomNotFound(room_id))?;
        Ok(self
            .broadcaster
            .broadcast_to_room(room.id, room.customer_id, data))
    }

    fn notify(&self, room: &ChatRoom, event: &RealtimeEvent) -> BroadcastReport {
        match serde_json::to_value(event) {
            Ok(payload) => self
                .broadcaster
                .broadcast_to_room(room.id, room.customer_id, &payload),
            Err(err) => {
                warn!(room_id = room.id, error = %err, "failed to serialize realtime event");
                BroadcastReport::default()
            }
        }
    }
}

fn normalize_content(content: &str) -> Result<String, ChatError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ChatError::InvalidContent("message cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(ChatError::InvalidContent(format!(
            "message exceeds {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_subject(subject: Option<&str>) -> Result<Option<String>, ChatError> {
    let Some(subject) = subject.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(ChatError::InvalidContent(format!(
            "subject exceeds {MAX_SUBJECT_LEN} characters"
        )));
    }
    Ok(Some(subject.to_string()))
}
