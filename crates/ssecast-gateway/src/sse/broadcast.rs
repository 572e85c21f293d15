use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use ssecast_protocol::frames::BroadcastEvent;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use super::registry::{SubscriberRegistry, Target};

/// Outcome of one broadcast pass. Never surfaced to publishers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FanoutReport {
    pub seq: u64,
    pub targeted: usize,
    pub delivered: usize,
    pub evicted: usize,
}

/// Fan-out events to every registered subscriber.
pub struct EventBroadcaster {
    registry: Arc<SubscriberRegistry>,
    /// Serializes passes so every subscriber sees events in accepted order.
    pass: Mutex<()>,
    seq: AtomicU64,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            registry,
            pass: Mutex::new(()),
            seq: AtomicU64::new(0),
        }
    }

    /// Encode `event` once and push it to a snapshot of the registry.
    ///
    /// A subscriber whose queue is closed or full is removed from the
    /// registry; the pass always continues with the remaining targets.
    pub fn broadcast(&self, event: &BroadcastEvent) -> FanoutReport {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);
        let frame = event.encode();
        let targets = self.registry.snapshot();
        let mut report = self.fan_out(&frame, &targets);
        report.seq = self.seq.fetch_add(1, Ordering::Relaxed);
        debug!(
            event = event.event_type(),
            seq = report.seq,
            targeted = report.targeted,
            delivered = report.delivered,
            evicted = report.evicted,
            "broadcast pass complete"
        );
        report
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    fn fan_out(&self, frame: &Bytes, targets: &[Target]) -> FanoutReport {
        let mut report = FanoutReport {
            targeted: targets.len(),
            ..Default::default()
        };
        for target in targets {
            match target.tx.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber_id = %target.id, "subscriber queue full, evicting");
                    self.registry.remove(&target.id);
                    report.evicted += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber_id = %target.id, "subscriber stream closed, evicting");
                    self.registry.remove(&target.id);
                    report.evicted += 1;
                }
            }
        }
        report
    }
}
