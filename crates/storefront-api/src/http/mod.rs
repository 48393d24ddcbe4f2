//! HTTP layer for Storefront support chat.
//!
//! Axum routes at `/api/v1/` with bearer-token authentication, envelope
//! response format, CORS, and the `text/event-stream` realtime endpoint.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
