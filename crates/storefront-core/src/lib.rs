//! Business logic and repository trait definitions for Storefront support chat.
//!
//! The `realtime` module owns the in-memory side: connection registry,
//! broadcast dispatcher, heartbeat, and stream lifecycle. The `chat` module
//! defines the `ChatRepository` port and the service that persists messages
//! and then broadcasts them. This crate depends only on `storefront-types`,
//! never on `storefront-infra` or any database/IO crate.

pub mod chat;
pub mod realtime;
