//! Subscription manager (§4.6.2): keyed map `draft_id -> set<subscription>`.
//! Broadcast snapshots the target set under a read lock, releases it, then
//! fans out without holding the lock — a slow or dead subscriber is evicted
//! rather than allowed to stall the bus consumer.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use domain::events::EventEnvelope;

/// Bounded outbound queue depth per connection. A subscriber that can't keep
/// up within this many buffered events is evicted rather than let to grow
/// unboundedly and eventually stall the consumer loop.
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

#[derive(Clone)]
struct Subscription {
    connection_id: Uuid,
    tx: mpsc::Sender<EventEnvelope>,
}

/// Handle returned to a newly-registered connection: the receiving end of
/// its outbound queue, plus everything needed to unregister on disconnect.
pub struct SubscriptionHandle {
    pub connection_id: Uuid,
    pub draft_id: Uuid,
    pub rx: mpsc::Receiver<EventEnvelope>,
}

#[derive(Clone, Default)]
pub struct SubscriptionManager {
    /// draft_id -> subscriptions for that draft. Its own lock, independent
    /// of the projection store's.
    drafts: Arc<RwLock<HashMap<Uuid, Vec<Subscription>>>>,
    /// connection_id -> draft_id, for O(1) stats/teardown lookups, matching
    /// the teacher's flat connection-count index.
    connections: Arc<DashMap<Uuid, Uuid>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, draft_id: Uuid) -> SubscriptionHandle {
        let connection_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);

        {
            let mut drafts = self.drafts.write().await;
            drafts
                .entry(draft_id)
                .or_default()
                .push(Subscription { connection_id, tx });
        }
        self.connections.insert(connection_id, draft_id);

        info!(%connection_id, %draft_id, "subscription registered");
        SubscriptionHandle {
            connection_id,
            draft_id,
            rx,
        }
    }

    pub async fn unsubscribe(&self, connection_id: Uuid) {
        let Some((_, draft_id)) = self.connections.remove(&connection_id) else {
            return;
        };

        let mut drafts = self.drafts.write().await;
        if let Some(subs) = drafts.get_mut(&draft_id) {
            subs.retain(|s| s.connection_id != connection_id);
            if subs.is_empty() {
                drafts.remove(&draft_id);
            }
        }
        debug!(%connection_id, %draft_id, "subscription unregistered");
    }

    /// Broadcast `envelope` to every subscription on `envelope.draft_id`.
    /// Steps match §4.6.2: snapshot under read lock, release, then send
    /// without holding it.
    pub async fn broadcast(&self, envelope: &EventEnvelope) {
        let targets = {
            let drafts = self.drafts.read().await;
            match drafts.get(&envelope.draft_id) {
                Some(subs) => subs.clone(),
                None => return,
            }
        };

        let mut dead = Vec::new();
        for sub in &targets {
            match sub.tx.try_send(envelope.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(connection_id = %sub.connection_id, "outbound queue full, evicting slow subscriber");
                    dead.push(sub.connection_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(sub.connection_id);
                }
            }
        }

        for connection_id in dead {
            self.unsubscribe(connection_id).await;
        }
    }

    pub fn total_connections(&self) -> usize {
        self.connections.len()
    }

    pub async fn total_drafts_with_subscribers(&self) -> usize {
        self.drafts.read().await.len()
    }

    pub async fn subscriber_count(&self, draft_id: Uuid) -> usize {
        self.drafts.read().await.get(&draft_id).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::events::EventKind;

    fn envelope(draft_id: Uuid) -> EventEnvelope {
        EventEnvelope {
            id: Uuid::new_v4(),
            draft_id,
            kind: EventKind::PickMade,
            timestamp: Utc::now(),
            data: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn broadcast_delivers_to_subscriber() {
        let manager = SubscriptionManager::new();
        let draft_id = Uuid::new_v4();
        let mut handle = manager.subscribe(draft_id).await;

        manager.broadcast(&envelope(draft_id)).await;

        let received = handle.rx.recv().await.expect("expected a message");
        assert_eq!(received.draft_id, draft_id);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_and_cleans_up_empty_draft_entry() {
        let manager = SubscriptionManager::new();
        let draft_id = Uuid::new_v4();
        let handle = manager.subscribe(draft_id).await;
        manager.unsubscribe(handle.connection_id).await;

        assert_eq!(manager.subscriber_count(draft_id).await, 0);
        assert_eq!(manager.total_drafts_with_subscribers().await, 0);
        assert_eq!(manager.total_connections(), 0);
    }

    #[tokio::test]
    async fn full_queue_evicts_the_slow_subscriber() {
        let manager = SubscriptionManager::new();
        let draft_id = Uuid::new_v4();
        let _handle = manager.subscribe(draft_id).await;

        for _ in 0..(OUTBOUND_QUEUE_CAPACITY + 10) {
            manager.broadcast(&envelope(draft_id)).await;
        }

        assert_eq!(manager.total_connections(), 0);
    }
}
