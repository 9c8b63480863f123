//! Non-blocking fan-out of `MeshEvent`s to any number of subscribers.
//!
//! Each subscriber owns a bounded channel and is read by its own dedicated
//! consumer task (the WebSocket writer in `mesh-web`); the hub itself only
//! ever enqueues, so one slow or stuck subscriber can never stall delivery
//! to the others — the same "owned channel, dedicated consumer" shape the
//! teacher uses for `AppState::pending_streams`, generalized here from a
//! polled map to a real push channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use mesh_types::MeshEvent;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::config::SUBSCRIBER_QUEUE_DEPTH;

pub type SubscriberId = u64;

pub struct EventHub {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<MeshEvent>>>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Self {
        EventHub {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new subscriber and returns its id, a sender it can use
    /// to push an initial-state replay to itself, and the receiving half.
    pub fn subscribe(&self) -> (SubscriberId, mpsc::Sender<MeshEvent>, mpsc::Receiver<MeshEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().insert(id, tx.clone());
        (id, tx, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Serializes nothing itself (the event is already a value) but fans
    /// the same clone out to every subscriber with a non-blocking send.
    /// A full queue drops the message for that subscriber only; it is
    /// never a reason to block or error out the broadcaster.
    pub fn broadcast(&self, event: MeshEvent) {
        let subs = self.subscribers.read();
        for (id, tx) in subs.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(subscriber = id, "event queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = id, "subscriber channel closed");
                }
            }
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
