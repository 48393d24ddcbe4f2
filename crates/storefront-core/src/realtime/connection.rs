//! Stream lifecycle for one open connection.
//!
//! `Connecting → Open → {closed by client | closed by write failure |
//! closed by timeout (global only)}`. Every terminal state removes the
//! registry entry. Reconnection is the client's job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::Stream;
use storefront_types::config::RealtimeConfig;
use storefront_types::event::RealtimeEvent;
use storefront_types::principal::Principal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::channel::{ConnectionChannel, Frame};
use super::heartbeat::spawn_heartbeat;
use super::key::ConnectionKey;
use super::registry::ConnectionRegistry;

/// Timer and buffer settings applied to every opened stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub heartbeat_interval: Duration,
    pub global_idle_timeout: Duration,
    pub channel_capacity: usize,
}

/// Zero values fall back to the defaults: a zero period would panic the
/// heartbeat timer and a zero-capacity channel cannot be created.
impl From<&RealtimeConfig> for ConnectionSettings {
    fn from(config: &RealtimeConfig) -> Self {
        let defaults = RealtimeConfig::default();
        let pick = |value: Duration, default: Duration| {
            if value.is_zero() { default } else { value }
        };

        Self {
            heartbeat_interval: pick(config.heartbeat_interval(), defaults.heartbeat_interval()),
            global_idle_timeout: pick(
                config.global_idle_timeout(),
                defaults.global_idle_timeout(),
            ),
            channel_capacity: match config.channel_capacity {
                0 => defaults.channel_capacity,
                n => n,
            },
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&RealtimeConfig::default())
    }
}

/// Removes the registry entry and stops the heartbeat when the stream drops.
struct ConnectionGuard {
    registry: Arc<ConnectionRegistry>,
    key: ConnectionKey,
    channel_id: Uuid,
    cancel: CancellationToken,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.registry.unregister_channel(&self.key, self.channel_id);
        info!(connection = %self.key, "stream closed");
    }
}

/// Open a connection for `key` and return the frames to write to the client.
///
/// The channel is registered immediately (replacing any previous stream with
/// the same key) and a `connected` frame is queued. Global connections also
/// get a heartbeat and end after `global_idle_timeout`.
///
/// Dropping the returned stream is the client-abort signal.
pub fn open(
    registry: Arc<ConnectionRegistry>,
    key: ConnectionKey,
    audience: Principal,
    settings: ConnectionSettings,
) -> impl Stream<Item = Frame> + Send + 'static {
    let (channel, mut rx) = ConnectionChannel::new(audience, settings.channel_capacity);
    let channel_id = channel.id();
    let cancel = registry.shutdown_token().child_token();

    registry.register(key, channel.clone());
    info!(connection = %key, %channel_id, "stream opened");

    let connected = RealtimeEvent::Connected {
        connection_id: key.to_string(),
        timestamp: Utc::now(),
    };
    match Frame::new(&connected) {
        Ok(frame) => {
            if let Err(err) = channel.push(&frame) {
                warn!(connection = %key, error = %err, "failed to queue connected frame");
            }
        }
        Err(err) => warn!(connection = %key, error = %err, "failed to serialize connected frame"),
    }

    let idle_timeout = if key.is_global() {
        spawn_heartbeat(
            registry.clone(),
            key,
            channel,
            settings.heartbeat_interval,
            cancel.clone(),
        );
        Some(settings.global_idle_timeout)
    } else {
        // The registry holds the only sender: a replacement closes this stream.
        drop(channel);
        None
    };

    let guard = ConnectionGuard {
        registry,
        key,
        channel_id,
        cancel: cancel.clone(),
    };

    async_stream::stream! {
        let _guard = guard;
        let idle = tokio::time::sleep(idle_timeout.unwrap_or_default());
        tokio::pin!(idle);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(connection = %key, "stream cancelled");
                    None
                }
                frame = rx.recv() => frame,
                _ = &mut idle, if idle_timeout.is_some() => {
                    debug!(connection = %key, "global stream timed out");
                    None
                }
            };

            match next {
                Some(frame) => yield frame,
                None => break,
            }
        }
    }
}
