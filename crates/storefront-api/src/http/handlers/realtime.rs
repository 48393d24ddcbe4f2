//! Realtime endpoints.
//!
//! Endpoints:
//! - GET  /api/v1/realtime/stream?roomId=N  - Room event stream
//! - GET  /api/v1/realtime/stream?global=true - Every visible room's events
//! - POST /api/v1/realtime/broadcast        - Push a payload to a room (admin)
//! - GET  /api/v1/realtime/connections      - Open connection keys (admin)
//!
//! Each stream frame is one SSE `data:` line holding a JSON event.

use std::convert::Infallible;
use std::time::Instant;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_stream::Stream;
use uuid::Uuid;

use storefront_core::realtime::{ConnectionKey, connection};

use crate::http::error::AppError;
use crate::http::extractors::auth::{Authenticated, StreamAuthenticated};
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for the stream endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub room_id: Option<i64>,
    #[serde(default)]
    pub global: bool,
}

/// Request body for the broadcast trigger. Both fields are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub room_id: Option<i64>,
    pub data: Option<Value>,
}

/// GET /api/v1/realtime/stream - Open an event stream.
///
/// Room streams require access to the room. The connection stays registered
/// until the client disconnects, a write fails, or (global only) the timeout
/// elapses.
pub async fn stream(
    State(state): State<AppState>,
    StreamAuthenticated(principal): StreamAuthenticated,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let key = match (query.room_id, query.global) {
        (Some(_), true) => {
            return Err(AppError::Validation(
                "Specify either roomId or global=true, not both".to_string(),
            ));
        }
        (Some(room_id), false) => {
            state.chat_service.authorize_room(&principal, room_id).await?;
            ConnectionKey::room(principal.user_id, room_id)
        }
        (None, true) => ConnectionKey::global(principal.user_id),
        (None, false) => {
            return Err(AppError::Validation(
                "Missing roomId or global=true".to_string(),
            ));
        }
    };

    let frames = connection::open(state.registry.clone(), key, principal, state.settings);
    let events = frames.map(|frame| Ok(Event::default().data(frame.json())));

    Ok(Sse::new(events))
}

/// POST /api/v1/realtime/broadcast - Push `data` to everyone watching `roomId`.
///
/// Returns how many connections were written to.
pub async fn broadcast(
    State(state): State<AppState>,
    auth: Authenticated,
    body: Result<Json<BroadcastRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    auth.require_admin()?;

    let Json(body) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let (Some(room_id), Some(data)) = (body.room_id, body.data) else {
        return Err(AppError::Validation(
            "Both roomId and data are required".to_string(),
        ));
    };

    let report = state.chat_service.relay(room_id, &data).await?;
    tracing::debug!(
        room_id,
        room = report.room,
        global = report.global,
        pruned = report.pruned,
        "broadcast trigger"
    );

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        json!({ "notified": report.delivered() }),
        request_id,
        elapsed,
    )))
}

/// GET /api/v1/realtime/connections - Connection count and keys.
pub async fn connections(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    auth.require_admin()?;

    let mut keys: Vec<String> = state.registry.keys().iter().map(ToString::to_string).collect();
    keys.sort();

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        json!({ "count": keys.len(), "keys": keys }),
        request_id,
        elapsed,
    )
    .with_link("self", "/api/v1/realtime/connections");

    Ok(Json(resp))
}
