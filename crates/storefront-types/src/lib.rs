//! Shared domain types for the Storefront support chat.
//!
//! Chat rooms and messages, realtime event payloads, principals, global
//! configuration, and the error types shared across crates.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod principal;
