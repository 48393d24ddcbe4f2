//! Push channels and frames.
//!
//! A [`ConnectionChannel`] is the sending half of one open stream. The
//! receiving half is drained by the HTTP response; once the client goes away
//! the receiver is dropped and every further push fails with
//! [`PushError::Closed`].

use std::sync::Arc;

use serde::Serialize;
use storefront_types::principal::Principal;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Errors from pushing a frame into a channel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    /// The receiving stream has been dropped.
    #[error("channel closed")]
    Closed,

    /// The client is not draining its stream.
    #[error("channel full")]
    Full,
}

/// One serialized JSON payload, shared between every channel it is pushed to.
///
/// Rendered on the wire as `data: <json>\n\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Arc<str>);

impl Frame {
    /// Serialize `payload` once.
    pub fn new<T: Serialize + ?Sized>(payload: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(payload)?;
        Ok(Self(Arc::from(json)))
    }

    /// Build a frame from an already-parsed JSON value. Cannot fail.
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self(Arc::from(value.to_string()))
    }

    pub fn json(&self) -> &str {
        &self.0
    }
}

/// Sending half of one open stream.
///
/// Cloning shares the same underlying queue; frames pushed through any clone
/// arrive in push order.
#[derive(Debug, Clone)]
pub struct ConnectionChannel {
    id: Uuid,
    audience: Principal,
    sender: mpsc::Sender<Frame>,
}

impl ConnectionChannel {
    /// Create a channel with room for `capacity` undelivered frames.
    pub fn new(audience: Principal, capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let channel = Self {
            id: Uuid::now_v7(),
            audience,
            sender,
        };
        (channel, receiver)
    }

    /// Unique per opened stream; survives clones.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The user this stream was opened for.
    pub fn audience(&self) -> Principal {
        self.audience
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queue a frame without waiting.
    pub fn push(&self, frame: &Frame) -> Result<(), PushError> {
        self.sender.try_send(frame.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PushError::Full,
            mpsc::error::TrySendError::Closed(_) => PushError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_serializes_once_and_shares() {
        let frame = Frame::new(&json!({ "type": "typing", "roomId": 5 })).unwrap();
        let copy = frame.clone();
        let parsed: serde_json::Value = serde_json::from_str(frame.json()).unwrap();
        assert_eq!(parsed, json!({ "type": "typing", "roomId": 5 }));
        assert!(Arc::ptr_eq(&frame.0, &copy.0));
    }

    #[tokio::test]
    async fn test_push_delivers_in_order() {
        let (channel, mut rx) = ConnectionChannel::new(Principal::customer(1), 8);
        channel.push(&Frame::from_value(&json!(1))).unwrap();
        channel.push(&Frame::from_value(&json!(2))).unwrap();

        assert_eq!(rx.recv().await.unwrap().json(), "1");
        assert_eq!(rx.recv().await.unwrap().json(), "2");
    }

    #[test]
    fn test_push_after_receiver_dropped_is_closed() {
        let (channel, rx) = ConnectionChannel::new(Principal::customer(1), 8);
        drop(rx);
        assert!(channel.is_closed());
        assert_eq!(
            channel.push(&Frame::from_value(&json!({}))),
            Err(PushError::Closed)
        );
    }

    #[test]
    fn test_push_beyond_capacity_is_full() {
        let (channel, _rx) = ConnectionChannel::new(Principal::admin(1), 1);
        let frame = Frame::from_value(&json!({}));
        channel.push(&frame).unwrap();
        assert_eq!(channel.push(&frame), Err(PushError::Full));
    }

    #[test]
    fn test_clones_share_identity() {
        let (channel, _rx) = ConnectionChannel::new(Principal::admin(4), 4);
        let (other, _rx2) = ConnectionChannel::new(Principal::admin(4), 4);
        assert_eq!(channel.clone().id(), channel.id());
        assert_ne!(channel.id(), other.id());
        assert_eq!(channel.audience(), Principal::admin(4));
    }
}
