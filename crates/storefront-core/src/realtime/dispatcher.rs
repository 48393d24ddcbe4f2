//! Best-effort fan-out of one event to every interested connection.
//!
//! Algorithm:
//! 1. Serialize the payload once.
//! 2. Push it verbatim to every channel scoped to the room.
//! 3. Push a copy with `roomId` attached to every global listener.
//! 4. Channels whose push fails are collected and removed after the walk.
//!
//! Failures never reach the caller: by the time a broadcast runs the message
//! is already committed, and a recipient that missed it will see it on its
//! next fetch or reconnect.

use std::sync::Arc;

use serde_json::Value;
use storefront_types::principal::Principal;
use tracing::{debug, warn};
use uuid::Uuid;

use super::channel::{ConnectionChannel, Frame};
use super::key::ConnectionKey;
use super::registry::ConnectionRegistry;

/// Outcome of one broadcast, used for diagnostic logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Room-scoped channels written to.
    pub room: usize,
    /// Global listeners written to.
    pub global: usize,
    /// Channels removed because their push failed.
    pub pruned: usize,
}

impl BroadcastReport {
    /// Channels successfully written to (room + global).
    pub fn delivered(&self) -> usize {
        self.room + self.global
    }
}

/// Dispatches events through a shared [`ConnectionRegistry`].
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Push `payload` to room `room_id` and to every global listener.
    pub fn broadcast(&self, room_id: i64, payload: &Value) -> BroadcastReport {
        self.dispatch(room_id, None, payload)
    }

    /// Like [`broadcast`](Self::broadcast), but global listeners belonging to
    /// customers other than `owner_id` are skipped. Admin listeners and the
    /// owner's own global listener still receive the event.
    pub fn broadcast_to_room(
        &self,
        room_id: i64,
        owner_id: i64,
        payload: &Value,
    ) -> BroadcastReport {
        self.dispatch(room_id, Some(owner_id), payload)
    }

    fn dispatch(&self, room_id: i64, owner_id: Option<i64>, payload: &Value) -> BroadcastReport {
        let room_frame = Frame::from_value(payload);
        let global_frame = Frame::from_value(&with_room_id(payload, room_id));

        let mut report = BroadcastReport::default();
        let mut dead: Vec<(ConnectionKey, Uuid)> = Vec::new();

        self.registry.for_each(|key, channel| {
            let frame = if key.is_room(room_id) {
                &room_frame
            } else if key.is_global() && global_allowed(channel, owner_id) {
                &global_frame
            } else {
                return;
            };

            match channel.push(frame) {
                Ok(()) if key.is_global() => report.global += 1,
                Ok(()) => report.room += 1,
                Err(err) => {
                    debug!(connection = %key, error = %err, "push failed, marking for removal");
                    dead.push((*key, channel.id()));
                }
            }
        });

        // Swept after the walk: the registry is not mutated mid-iteration.
        for (key, channel_id) in dead {
            if self.registry.unregister_channel(&key, channel_id) {
                report.pruned += 1;
            }
        }

        if report.pruned > 0 {
            warn!(
                room_id,
                pruned = report.pruned,
                "removed dead connections during broadcast"
            );
        }
        debug!(
            room_id,
            room = report.room,
            global = report.global,
            "broadcast dispatched"
        );

        report
    }
}

fn global_allowed(channel: &ConnectionChannel, owner_id: Option<i64>) -> bool {
    match owner_id {
        None => true,
        Some(owner_id) => {
            let audience: Principal = channel.audience();
            audience.is_admin() || audience.user_id == owner_id
        }
    }
}

/// Copy of `payload` carrying the numeric room id, for global listeners.
///
/// Non-object payloads are wrapped as `{"data": <payload>, "roomId": N}`.
fn with_room_id(payload: &Value, room_id: i64) -> Value {
    match payload {
        Value::Object(map) => {
            let mut map = map.clone();
            map.insert("roomId".to_string(), Value::from(room_id));
            Value::Object(map)
        }
        other => serde_json::json!({ "data": other, "roomId": room_id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn setup() -> (Arc<ConnectionRegistry>, Broadcaster) {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());
        (registry, broadcaster)
    }

    fn connect(
        registry: &ConnectionRegistry,
        key: &str,
        audience: Principal,
    ) -> mpsc::Receiver<Frame> {
        let (channel, rx) = ConnectionChannel::new(audience, 8);
        registry.register(key.parse().unwrap(), channel);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(frame.json()).unwrap());
        }
        out
    }

    #[test]
    fn test_reaches_room_and_global_listeners() {
        let (registry, broadcaster) = setup();
        let mut a = connect(&registry, "1-5", Principal::customer(1));
        let mut b = connect(&registry, "2-5", Principal::admin(2));
        let mut g = connect(&registry, "3-global", Principal::admin(3));

        let report = broadcaster.broadcast(5, &json!({ "type": "typing" }));

        assert_eq!(report, BroadcastReport { room: 2, global: 1, pruned: 0 });
        assert_eq!(report.delivered(), 3);
        assert_eq!(drain(&mut a).len(), 1);
        assert_eq!(drain(&mut b).len(), 1);
        assert_eq!(drain(&mut g).len(), 1);
    }

    #[test]
    fn test_other_rooms_are_not_written() {
        let (registry, broadcaster) = setup();
        let mut room5 = connect(&registry, "1-5", Principal::customer(1));
        let mut room6 = connect(&registry, "1-6", Principal::customer(1));
        let mut room15 = connect(&registry, "1-15", Principal::customer(1));

        broadcaster.broadcast(5, &json!({ "type": "typing" }));

        assert_eq!(drain(&mut room5).len(), 1);
        assert!(drain(&mut room6).is_empty());
        assert!(drain(&mut room15).is_empty());
    }

    #[test]
    fn test_global_listener_gets_room_id_attached() {
        let (registry, broadcaster) = setup();
        let mut room = connect(&registry, "1-7", Principal::customer(1));
        let mut global = connect(&registry, "9-global", Principal::admin(9));
        let payload = json!({ "type": "new_message", "message": { "content": "hi" } });

        broadcaster.broadcast(7, &payload);

        assert_eq!(drain(&mut room), vec![payload.clone()]);
        assert_eq!(
            drain(&mut global),
            vec![json!({ "type": "new_message", "message": { "content": "hi" }, "roomId": 7 })]
        );
    }

    #[test]
    fn test_non_object_payload_wrapped_for_global() {
        let (registry, broadcaster) = setup();
        let mut global = connect(&registry, "9-global", Principal::admin(9));

        broadcaster.broadcast(3, &json!("ping"));

        assert_eq!(drain(&mut global), vec![json!({ "data": "ping", "roomId": 3 })]);
    }

    #[test]
    fn test_failed_channel_is_pruned_and_not_retried() {
        let (registry, broadcaster) = setup();
        let live = connect(&registry, "1-5", Principal::customer(1));
        let dead = connect(&registry, "2-5", Principal::admin(2));
        drop(dead);

        let first = broadcaster.broadcast(5, &json!({ "type": "typing" }));
        assert_eq!(first.room, 1);
        assert_eq!(first.pruned, 1);
        assert!(!registry.contains(&"2-5".parse().unwrap()));

        let second = broadcaster.broadcast(5, &json!({ "type": "typing" }));
        assert_eq!(second, BroadcastReport { room: 1, global: 0, pruned: 0 });
        drop(live);
    }

    #[test]
    fn test_reregistered_key_delivers_to_newest_only() {
        let (registry, broadcaster) = setup();
        let mut first = connect(&registry, "1-5", Principal::customer(1));
        let mut second = connect(&registry, "1-5", Principal::customer(1));

        let report = broadcaster.broadcast(5, &json!({ "type": "typing" }));

        assert_eq!(report.delivered(), 1);
        assert!(drain(&mut first).is_empty());
        assert_eq!(drain(&mut second).len(), 1);
    }

    #[test]
    fn test_owner_scoped_skips_other_customers_globals() {
        let (registry, broadcaster) = setup();
        let mut owner = connect(&registry, "1-global", Principal::customer(1));
        let mut stranger = connect(&registry, "2-global", Principal::customer(2));
        let mut admin = connect(&registry, "3-global", Principal::admin(3));

        let report = broadcaster.broadcast_to_room(5, 1, &json!({ "type": "typing" }));

        assert_eq!(report.global, 2);
        assert_eq!(drain(&mut owner).len(), 1);
        assert!(drain(&mut stranger).is_empty());
        assert_eq!(drain(&mut admin).len(), 1);
    }

    #[test]
    fn test_broadcast_with_no_connections() {
        let (_registry, broadcaster) = setup();
        let report = broadcaster.broadcast(1, &json!({ "type": "typing" }));
        assert_eq!(report, BroadcastReport::default());
    }
}
