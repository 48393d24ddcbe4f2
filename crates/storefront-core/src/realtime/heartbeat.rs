//! Liveness frames for global streams.
//!
//! Each global connection gets its own repeating timer. A tick pushes a
//! `heartbeat` frame; the timer stops when the connection is no longer the
//! registered one, when the push fails, or when the stream is cancelled.

use std::sync::Arc;
use std::time::Duration;

use storefront_types::event::RealtimeEvent;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::channel::{ConnectionChannel, Frame};
use super::key::ConnectionKey;
use super::registry::ConnectionRegistry;

/// Spawn the heartbeat task for one global connection.
///
/// The first frame goes out one `period` after the call. On push failure the
/// entry is removed and `cancel` is triggered so the stream ends too.
pub fn spawn_heartbeat(
    registry: Arc<ConnectionRegistry>,
    key: ConnectionKey,
    channel: ConnectionChannel,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(connection = %key, "heartbeat cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    if !registry.contains_channel(&key, channel.id()) {
                        debug!(connection = %key, "connection superseded, stopping heartbeat");
                        cancel.cancel();
                        break;
                    }

                    let frame = match Frame::new(&RealtimeEvent::heartbeat()) {
                        Ok(frame) => frame,
                        Err(err) => {
                            warn!(connection = %key, error = %err, "failed to serialize heartbeat");
                            continue;
                        }
                    };

                    if let Err(err) = channel.push(&frame) {
                        debug!(connection = %key, error = %err, "heartbeat push failed");
                        registry.unregister_channel(&key, channel.id());
                        cancel.cancel();
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_types::principal::Principal;

    const PERIOD: Duration = Duration::from_secs(30);

    fn register(
        registry: &ConnectionRegistry,
        user_id: i64,
    ) -> (ConnectionKey, ConnectionChannel, tokio::sync::mpsc::Receiver<Frame>) {
        let key = ConnectionKey::global(user_id);
        let (channel, rx) = ConnectionChannel::new(Principal::admin(user_id), 8);
        registry.register(key, channel.clone());
        (key, channel, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushes_heartbeat_each_period() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (key, channel, mut rx) = register(&registry, 1);
        let cancel = CancellationToken::new();
        let handle = spawn_heartbeat(registry.clone(), key, channel, PERIOD, cancel.clone());

        let frame = rx.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(frame.json()).unwrap();
        assert_eq!(json["type"], "heartbeat");

        rx.recv().await.unwrap();

        cancel.cancel();
        handle.await.unwrap();
        assert!(registry.contains(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_push_unregisters_and_cancels() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (key, channel, rx) = register(&registry, 1);
        drop(rx);
        let cancel = CancellationToken::new();
        let handle = spawn_heartbeat(registry.clone(), key, channel, PERIOD, cancel.clone());

        handle.await.unwrap();

        assert!(!registry.contains(&key));
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_connection_removed() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (key, channel, mut rx) = register(&registry, 1);
        registry.unregister(&key);
        let cancel = CancellationToken::new();
        let handle = spawn_heartbeat(registry.clone(), key, channel, PERIOD, cancel.clone());

        handle.await.unwrap();

        assert!(cancel.is_cancelled());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_connection_leaves_replacement_alone() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (key, old_channel, _old_rx) = register(&registry, 1);
        let (_, new_channel, _new_rx) = register(&registry, 1);
        let cancel = CancellationToken::new();
        let handle = spawn_heartbeat(registry.clone(), key, old_channel, PERIOD, cancel.clone());

        handle.await.unwrap();

        assert!(registry.contains_channel(&key, new_channel.id()));
    }
}
