use std::sync::Arc;
use std::time::Duration;

use ssecast_protocol::frames::BroadcastEvent;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace};

use super::broadcast::EventBroadcaster;

/// Start the keep-alive driver: one `ping` broadcast per `period` until
/// `stop` flips to true or its sender is dropped.
pub fn spawn(
    broadcaster: Arc<EventBroadcaster>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // consume first immediate tick
        info!(period_secs = period.as_secs(), "keep-alive driver started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = broadcaster.broadcast(&BroadcastEvent::ping());
                    trace!(seq = report.seq, delivered = report.delivered, "ping");
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        info!("keep-alive driver stopped");
                        break;
                    }
                }
            }
        }
    })
}
