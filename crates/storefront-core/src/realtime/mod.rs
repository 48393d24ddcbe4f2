//! In-process realtime push layer for support chat.
//!
//! - [`registry::ConnectionRegistry`] maps connection keys to open channels.
//! - [`dispatcher::Broadcaster`] fans one event out to a room's channels and
//!   to every global listener.
//! - [`heartbeat`] keeps global streams alive through idle-closing proxies.
//! - [`connection::open`] ties a channel's lifetime to an HTTP response stream.
//!
//! Each process holds its own registry; broadcasts only reach connections
//! opened against the same process.

pub mod channel;
pub mod connection;
pub mod dispatcher;
pub mod heartbeat;
pub mod key;
pub mod registry;

pub use channel::{ConnectionChannel, Frame, PushError};
pub use connection::ConnectionSettings;
pub use dispatcher::{BroadcastReport, Broadcaster};
pub use key::{ConnectionKey, ConnectionScope};
pub use registry::ConnectionRegistry;
