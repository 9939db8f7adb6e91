//! Per-session listener fan-out.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifier of one listener connection.
pub type ListenerId = u64;

/// Serialized message delivered to listeners.
pub type Payload = Arc<str>;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Outbound channel of a connected viewer (WebSocket or SSE).
#[derive(Clone, Debug)]
pub struct Listener {
    /// Unique identifier of this connection.
    pub id: ListenerId,
    /// Channel drained by the connection's writer task.
    pub tx: mpsc::UnboundedSender<Payload>,
}

impl Listener {
    /// Allocate a fresh listener, returning it with the receiving half.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Payload>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        (Self { id, tx }, rx)
    }
}

/// Tracks which listeners watch which session.
///
/// Entries are sharded per session so that connects, disconnects and
/// publishes on different sessions never contend on the same lock.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, HashMap<ListenerId, mpsc::UnboundedSender<Payload>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `session_id`. Registering twice is a no-op.
    pub fn subscribe(&self, session_id: Uuid, listener: &Listener) {
        self.sessions
            .entry(session_id)
            .or_default()
            .entry(listener.id)
            .or_insert_with(|| listener.tx.clone());
    }

    /// Remove a listener; the session entry disappears with its last listener.
    pub fn unsubscribe(&self, session_id: Uuid, listener_id: ListenerId) {
        if let Some(mut listeners) = self.sessions.get_mut(&session_id) {
            listeners.remove(&listener_id);
        }
        self.sessions
            .remove_if(&session_id, |_, listeners| listeners.is_empty());
    }

    /// Serialize `message` once and send it to every listener of the session.
    ///
    /// Listeners whose channel is closed are dropped. Returns the number of
    /// listeners that accepted the message.
    pub fn publish<T>(&self, session_id: Uuid, message: &T) -> usize
    where
        T: ?Sized + Serialize,
    {
        let payload: Payload = match serde_json::to_string(message) {
            Ok(json) => json.into(),
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "failed to serialize session message");
                return 0;
            }
        };
        self.publish_raw(session_id, payload)
    }

    /// Send an already serialized payload to every listener of the session.
    pub fn publish_raw(&self, session_id: Uuid, payload: Payload) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();

        if let Some(listeners) = self.sessions.get(&session_id) {
            for (id, tx) in listeners.iter() {
                if tx.send(payload.clone()).is_ok() {
                    delivered += 1;
                } else {
                    stale.push(*id);
                }
            }
        }

        for id in stale {
            warn!(session_id = %session_id, listener_id = id, "dropping stale listener");
            self.unsubscribe(session_id, id);
        }

        debug!(session_id = %session_id, delivered, "published session message");
        delivered
    }

    /// Number of listeners currently registered for the session.
    pub fn listener_count(&self, session_id: Uuid) -> usize {
        self.sessions
            .get(&session_id)
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    /// Number of sessions with at least one listener.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn publish_reaches_every_listener_of_the_session() {
        let registry = SessionRegistry::new();
        let session = Uuid::new_v4();
        let other = Uuid::new_v4();
        let (a, mut rx_a) = Listener::channel();
        let (b, mut rx_b) = Listener::channel();
        let (c, mut rx_c) = Listener::channel();
        registry.subscribe(session, &a);
        registry.subscribe(session, &b);
        registry.subscribe(other, &c);

        let delivered = registry.publish(session, &json!({"type": "snapshot"}));

        assert_eq!(delivered, 2);
        assert_eq!(&*rx_a.try_recv().unwrap(), r#"{"type":"snapshot"}"#);
        assert_eq!(&*rx_b.try_recv().unwrap(), r#"{"type":"snapshot"}"#);
        assert!(rx_c.try_recv().is_err());
    }

    #[test]
    fn subscribe_is_idempotent() {
        let registry = SessionRegistry::new();
        let session = Uuid::new_v4();
        let (listener, mut rx) = Listener::channel();

        registry.subscribe(session, &listener);
        registry.subscribe(session, &listener);

        assert_eq!(registry.listener_count(session), 1);
        assert_eq!(registry.publish(session, "x"), 1);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn last_unsubscribe_removes_the_session_entry() {
        let registry = SessionRegistry::new();
        let session = Uuid::new_v4();
        let (a, _rx_a) = Listener::channel();
        let (b, _rx_b) = Listener::channel();
        registry.subscribe(session, &a);
        registry.subscribe(session, &b);

        registry.unsubscribe(session, a.id);
        assert_eq!(registry.session_count(), 1);

        registry.unsubscribe(session, b.id);
        assert_eq!(registry.session_count(), 0);
        assert_eq!(registry.listener_count(session), 0);
    }

    #[test]
    fn stale_listener_is_dropped_without_affecting_others() {
        let registry = SessionRegistry::new();
        let session = Uuid::new_v4();
        let (alive, mut rx_alive) = Listener::channel();
        let (dead, rx_dead) = Listener::channel();
        registry.subscribe(session, &alive);
        registry.subscribe(session, &dead);
        drop(rx_dead);

        let delivered = registry.publish(session, &json!({"n": 1}));

        assert_eq!(delivered, 1);
        assert!(rx_alive.try_recv().is_ok());
        assert_eq!(registry.listener_count(session), 1);
    }

    #[test]
    fn publish_without_listeners_is_a_noop() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.publish(Uuid::new_v4(), &json!({})), 0);
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn unsubscribe_unknown_listener_is_harmless() {
        let registry = SessionRegistry::new();
        let session = Uuid::new_v4();
        let (listener, _rx) = Listener::channel();
        registry.subscribe(session, &listener);

        registry.unsubscribe(session, listener.id + 1000);
        registry.unsubscribe(Uuid::new_v4(), listener.id);

        assert_eq!(registry.listener_count(session), 1);
    }
}
