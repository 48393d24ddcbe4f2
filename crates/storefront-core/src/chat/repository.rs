//! ChatRepository trait definition.
//!
//! Room and message persistence for support chat.

use chrono::{DateTime, Utc};
use storefront_types::chat::{ChatMessage, ChatRoom, RoomStatus};
use storefront_types::error::RepositoryError;
use storefront_types::principal::Role;

/// Repository trait for chat room and message persistence.
///
/// Implementations live in storefront-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    /// The customer's most recent open room, or a new one created with `subject`.
    ///
    /// Lookup and insert run as one atomic unit: concurrent calls for the same
    /// customer yield a single room. The flag is `true` when the room was created.
    fn find_or_create_open_room(
        &self,
        customer_id: i64,
        subject: Option<&str>,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(ChatRoom, bool), RepositoryError>> + Send;

    /// Get a room by id.
    fn get_room(
        &self,
        room_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<ChatRoom>, RepositoryError>> + Send;

    /// List rooms, most recently active first. `None` lists every room.
    fn list_rooms(
        &self,
        customer_id: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<ChatRoom>, RepositoryError>> + Send;

    /// Set a room's status. Returns `NotFound` if the room does not exist.
    fn update_room_status(
        &self,
        room_id: i64,
        status: RoomStatus,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist a message and bump the room's `last_message_at`.
    fn save_message(
        &self,
        room_id: i64,
        sender_id: i64,
        sender_role: Role,
        content: &str,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    /// Messages of a room, ordered by creation time ascending.
    fn get_messages(
        &self,
        room_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// The newest message of a room.
    fn last_message(
        &self,
        room_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// Messages in the room unread by `reader_role` (sent by the other side).
    fn count_unread(
        &self,
        room_id: i64,
        reader_role: Role,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Mark the other side's messages read. Returns how many were updated.
    fn mark_read(
        &self,
        room_id: i64,
        reader_role: Role,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
