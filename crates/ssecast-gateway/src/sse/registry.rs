use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use dashmap::DashMap;
use ssecast_core::types::SubscriberId;
use tokio::sync::mpsc;

/// One open subscriber stream.
pub struct Subscriber {
    pub id: SubscriberId,
    pub peer: SocketAddr,
    pub connected_at: Instant,
    tx: mpsc::Sender<Bytes>,
}

/// Write target for one broadcast pass. Dropped at the end of the pass.
#[derive(Clone)]
pub struct Target {
    pub id: SubscriberId,
    pub(crate) tx: mpsc::Sender<Bytes>,
}

/// Membership set of open subscriber streams.
///
/// Keyed by id so removal is O(1). The map is never iterated while a write
/// is in flight: broadcasts work on a [`snapshot`](Self::snapshot), which
/// keeps removal from a failing write off the shard locks.
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Subscriber>,
    queue_depth: usize,
}

impl SubscriberRegistry {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Register a new subscriber and return its id plus the receiving end of
    /// its frame queue. Never fails.
    pub fn register(&self, peer: SocketAddr) -> (SubscriberId, mpsc::Receiver<Bytes>) {
        let id = SubscriberId::new();
        let (tx, rx) = mpsc::channel(self.queue_depth);
        self.subscribers.insert(
            id.clone(),
            Subscriber {
                id: id.clone(),
                peer,
                connected_at: Instant::now(),
                tx,
            },
        );
        (id, rx)
    }

    /// Remove a subscriber. Unknown or already-removed ids are a no-op.
    /// Returns whether an entry was actually removed.
    pub fn remove(&self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    /// Number of registered subscribers.
    pub fn count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }

    pub fn peer(&self, id: &SubscriberId) -> Option<SocketAddr> {
        self.subscribers.get(id).map(|s| s.peer)
    }

    /// Targets for one broadcast pass.
    pub fn snapshot(&self) -> Vec<Target> {
        self.subscribers
            .iter()
            .map(|entry| Target {
                id: entry.key().clone(),
                tx: entry.value().tx.clone(),
            })
            .collect()
    }

    /// Drop every subscriber. Their streams end once queued frames drain.
    pub fn clear(&self) -> usize {
        let n = self.subscribers.len();
        self.subscribers.clear();
        n
    }
}
