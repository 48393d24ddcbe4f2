//! Process-wide map of open push channels.
//!
//! Keys follow the `"<userId>-<roomId>"` / `"<userId>-global"` convention and
//! map to at most one channel each. Registering an existing key replaces the
//! previous channel (last writer wins). There is no capacity bound.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::channel::ConnectionChannel;
use super::key::ConnectionKey;

/// Concurrent registry of open connections.
///
/// Shared through `Arc` between the streaming handler, the broadcast
/// dispatcher, and per-connection heartbeat tasks.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: DashMap<ConnectionKey, ConnectionChannel>,
    shutdown: CancellationToken,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token cancelled by [`close_all`](Self::close_all). Streams derive
    /// their own cancellation from it.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// End every open stream and empty the registry. Used on server shutdown.
    ///
    /// Returns how many entries were dropped.
    pub fn close_all(&self) -> usize {
        self.shutdown.cancel();
        let count = self.entries.len();
        self.entries.clear();
        info!(count, "closed all connections");
        count
    }

    /// Insert or overwrite the channel for `key`.
    ///
    /// Returns the channel that was replaced, if any.
    pub fn register(
        &self,
        key: ConnectionKey,
        channel: ConnectionChannel,
    ) -> Option<ConnectionChannel> {
        let channel_id = channel.id();
        let previous = self.entries.insert(key, channel);
        match &previous {
            Some(old) => debug!(
                connection = %key,
                %channel_id,
                replaced = %old.id(),
                "replaced existing connection"
            ),
            None => debug!(connection = %key, %channel_id, "registered connection"),
        }
        previous
    }

    /// Remove the entry for `key`. No-op when absent.
    ///
    /// Returns `true` if an entry was removed.
    pub fn unregister(&self, key: &ConnectionKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            debug!(connection = %key, "unregistered connection");
        }
        removed
    }

    /// Remove the entry for `key` only while it still holds `channel_id`.
    ///
    /// A stream that was superseded by a reconnect must not evict its
    /// replacement when it is torn down.
    pub fn unregister_channel(&self, key: &ConnectionKey, channel_id: Uuid) -> bool {
        let removed = self
            .entries
            .remove_if(key, |_, channel| channel.id() == channel_id)
            .is_some();
        if removed {
            debug!(connection = %key, %channel_id, "unregistered connection");
        }
        removed
    }

    pub fn contains(&self, key: &ConnectionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// True while `key` still maps to the channel with `channel_id`.
    pub fn contains_channel(&self, key: &ConnectionKey, channel_id: Uuid) -> bool {
        self.entries
            .get(key)
            .is_some_and(|channel| channel.id() == channel_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all registered keys, in no particular order.
    pub fn keys(&self) -> Vec<ConnectionKey> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Visit every entry, in no particular order.
    ///
    /// The callback runs while a shard lock is held: it must not call back
    /// into the registry. Collect keys and act on them afterwards instead.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&ConnectionKey, &ConnectionChannel),
    {
        for entry in self.entries.iter() {
            f(entry.key(), entry.value());
        }
    }
}
