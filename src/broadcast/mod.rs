// src/broadcast/mod.rs
use crate::registry::Registry;
use crate::snapshot::build_snapshot;
use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Per-subscriber inbox depth. Big enough to absorb a burst of updates,
/// small enough that a stalled client cannot hold much memory.
const INBOX_CAPACITY: usize = 10;

/// One live stream consumer. Dropping the `Broadcaster`-held sender (on
/// unsubscribe) ends the stream.
pub struct Subscription {
    pub id: uuid::Uuid,
    pub rx: mpsc::Receiver<Bytes>,
}

/// Fans snapshot payloads out to every connected dashboard client.
/// Delivery is best-effort: a full inbox drops that update for that one
/// subscriber and never blocks the publisher or the other subscribers.
pub struct Broadcaster {
    registry: Arc<Registry>,
    subscribers: RwLock<HashMap<uuid::Uuid, mpsc::Sender<Bytes>>>,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new stream consumer. The current state is pushed into the
    /// inbox before returning, so a fresh client never starts blank.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let id = uuid::Uuid::new_v4();

        let initial = Bytes::from(build_snapshot(&self.registry).await.to_bytes());
        let _ = tx.try_send(initial);

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id, tx);
        info!("Client connected, total clients: {}", subscribers.len());

        Subscription { id, rx }
    }

    /// Drop a subscriber; its receiver sees the channel close.
    pub async fn unsubscribe(&self, id: uuid::Uuid) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.remove(&id);
        info!("Client disconnected, total clients: {}", subscribers.len());
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Build one fresh snapshot and push it to every subscriber.
    pub async fn publish(&self) {
        let payload = Bytes::from(build_snapshot(&self.registry).await.to_bytes());

        let subscribers = self.subscribers.read().await;
        if subscribers.is_empty() {
            return;
        }

        for (id, tx) in subscribers.iter() {
            if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(payload.clone()) {
                warn!(%id, "client inbox full, skipping update");
            }
        }
        debug!("Broadcast update to {} clients", subscribers.len());
    }
}
