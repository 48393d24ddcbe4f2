//! Route handlers grouped by resource.

pub mod chat;
pub mod realtime;
