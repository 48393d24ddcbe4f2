//! Support chat room and message handlers.
//!
//! Endpoints:
//! - POST /api/v1/chat/rooms                 - Open (or reuse) the caller's room
//! - GET  /api/v1/chat/rooms                 - List visible rooms with unread counts
//! - GET  /api/v1/chat/rooms/{id}            - Get one room
//! - GET  /api/v1/chat/rooms/{id}/messages   - List messages
//! - POST /api/v1/chat/rooms/{id}/messages   - Send a message
//! - POST /api/v1/chat/rooms/{id}/typing     - Typing indicator
//! - POST /api/v1/chat/rooms/{id}/read       - Mark the other side's messages read
//! - PUT  /api/v1/chat/rooms/{id}/status     - Open or close a room

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use storefront_types::chat::{ChatMessage, ChatRoom, RoomStatus, RoomSummary};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OpenRoomRequest {
    pub subject: Option<String>,
}

/// Query parameters for message listing.
#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    #[serde(default = "default_message_limit")]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

fn default_message_limit() -> Option<i64> {
    Some(100)
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingRequest {
    pub is_typing: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: RoomStatus,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// POST /api/v1/chat/rooms - Open the caller's support room.
pub async fn open_room(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    body: Option<Json<OpenRoomRequest>>,
) -> Result<Json<ApiResponse<ChatRoom>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let Json(body) = body.unwrap_or_default();
    let room = state
        .chat_service
        .open_room(&principal, body.subject.as_deref())
        .await?;

    let link = format!("/api/v1/chat/rooms/{}", room.id);
    Ok(Json(
        ApiResponse::success(room, request_id, elapsed_ms(start)).with_link("self", &link),
    ))
}

/// GET /api/v1/chat/rooms - Rooms visible to the caller.
pub async fn list_rooms(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<Vec<RoomSummary>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let rooms = state.chat_service.list_rooms(&principal).await?;

    Ok(Json(
        ApiResponse::success(rooms, request_id, elapsed_ms(start))
            .with_link("self", "/api/v1/chat/rooms"),
    ))
}

/// GET /api/v1/chat/rooms/{id} - One room.
pub async fn get_room(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(room_id): Path<i64>,
) -> Result<Json<ApiResponse<ChatRoom>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let room = state.chat_service.authorize_room(&principal, room_id).await?;

    Ok(Json(
        ApiResponse::success(room, request_id, elapsed_ms(start))
            .with_link("messages", &format!("/api/v1/chat/rooms/{room_id}/messages")),
    ))
}

/// GET /api/v1/chat/rooms/{id}/messages - Messages, oldest first.
pub async fn get_messages(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(room_id): Path<i64>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let messages = state
        .chat_service
        .get_messages(&principal, room_id, query.limit, query.offset)
        .await?;

    Ok(Json(ApiResponse::success(messages, request_id, elapsed_ms(start))))
}

/// POST /api/v1/chat/rooms/{id}/messages - Persist and broadcast a message.
pub async fn send_message(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(room_id): Path<i64>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<ChatMessage>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let message = state
        .chat_service
        .send_message(&principal, room_id, &body.content)
        .await?;

    Ok(Json(ApiResponse::success(message, request_id, elapsed_ms(start))))
}

/// POST /api/v1/chat/rooms/{id}/typing - Broadcast a typing indicator.
pub async fn send_typing(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(room_id): Path<i64>,
    Json(body): Json<TypingRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let report = state
        .chat_service
        .send_typing(&principal, room_id, body.is_typing)
        .await?;

    Ok(Json(ApiResponse::success(
        json!({ "notified": report.delivered() }),
        request_id,
        elapsed_ms(start),
    )))
}

/// POST /api/v1/chat/rooms/{id}/read - Mark messages from the other side read.
pub async fn mark_read(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(room_id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let count = state.chat_service.mark_read(&principal, room_id).await?;

    Ok(Json(ApiResponse::success(
        json!({ "marked": count }),
        request_id,
        elapsed_ms(start),
    )))
}

/// PUT /api/v1/chat/rooms/{id}/status - Open or close a room.
pub async fn set_status(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(room_id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<ApiResponse<ChatRoom>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let room = state
        .chat_service
        .set_room_status(&principal, room_id, body.status)
        .await?;

    Ok(Json(ApiResponse::success(room, request_id, elapsed_ms(start))))
}
