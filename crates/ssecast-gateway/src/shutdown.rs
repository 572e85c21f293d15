//! `/exit` shutdown gate. Terminates only when no subscriber is connected.
//!
//! ```text
//! Running ──request() on empty registry──► Draining ──grace elapsed──► Terminated
//! ```
//!
//! There is no way back to `Running`. A subscriber that connects during the
//! grace delay is dropped when the process exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use crate::sse::registry::SubscriberRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    Draining,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// This call scheduled termination.
    Scheduled,
    /// An earlier call already did; nothing new was scheduled.
    AlreadyDraining,
}

/// Refusal because subscribers are still connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRefused {
    pub subscribers: usize,
}

pub struct ShutdownCoordinator {
    registry: Arc<SubscriberRegistry>,
    phase: Arc<watch::Sender<ShutdownPhase>>,
    grace: Duration,
}

impl ShutdownCoordinator {
    pub fn new(registry: Arc<SubscriberRegistry>, grace: Duration) -> Self {
        let (tx, _) = watch::channel(ShutdownPhase::Running);
        Self {
            registry,
            phase: Arc::new(tx),
            grace,
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.borrow()
    }

    /// Check the registry once and, if it is empty, schedule termination
    /// after the grace delay. Never waits for subscribers to leave.
    pub fn request(&self) -> Result<ShutdownOutcome, ShutdownRefused> {
        let subscribers = self.registry.count();
        if subscribers > 0 {
            return Err(ShutdownRefused { subscribers });
        }

        let entered = self.phase.send_if_modified(|phase| {
            if *phase == ShutdownPhase::Running {
                *phase = ShutdownPhase::Draining;
                true
            } else {
                false
            }
        });
        if !entered {
            return Ok(ShutdownOutcome::AlreadyDraining);
        }

        let phase = Arc::clone(&self.phase);
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            info!(grace_ms = grace.as_millis() as u64, "grace period elapsed, terminating");
            phase.send_replace(ShutdownPhase::Terminated);
        });
        info!(grace_ms = self.grace.as_millis() as u64, "shutdown scheduled");
        Ok(ShutdownOutcome::Scheduled)
    }

    /// Skip the gate (interrupt signal).
    pub fn terminate_now(&self) {
        self.phase.send_replace(ShutdownPhase::Terminated);
    }

    /// Resolve once the coordinator reaches `Terminated`.
    pub async fn terminated(&self) {
        let mut rx = self.phase.subscribe();
        // the sender lives in self, so wait_for cannot observe a closed channel
        let _ = rx.wait_for(|p| *p == ShutdownPhase::Terminated).await;
    }
}
