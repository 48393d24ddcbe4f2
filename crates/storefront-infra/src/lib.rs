//! Infrastructure layer for Storefront support chat.
//!
//! Contains implementations of the repository traits defined in
//! `storefront-core` (SQLite storage), bearer-token storage, and the
//! `config.toml` loader.

pub mod config;
pub mod sqlite;
