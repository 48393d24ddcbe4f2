//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Realtime
        .route("/realtime/stream", get(handlers::realtime::stream))
        .route("/realtime/broadcast", post(handlers::realtime::broadcast))
        .route("/realtime/connections", get(handlers::realtime::connections))
        // Rooms
        .route(
            "/chat/rooms",
            post(handlers::chat::open_room).get(handlers::chat::list_rooms),
        )
        .route("/chat/rooms/{id}", get(handlers::chat::get_room))
        .route("/chat/rooms/{id}/status", put(handlers::chat::set_status))
        // Messages
        .route(
            "/chat/rooms/{id}/messages",
            get(handlers::chat::get_messages).post(handlers::chat::send_message),
        )
        .route("/chat/rooms/{id}/typing", post(handlers::chat::send_typing))
        .route("/chat/rooms/{id}/read", post(handlers::chat::mark_read));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
