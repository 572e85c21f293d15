//! Publish endpoint: POST /bcast
//!
//! Request:  `{"event": "alert", "data": "fire"}` (`event` optional)
//! Response: `{"success": true}`
//! Error:    400 `{"success": false, "error": "..."}`

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use ssecast_protocol::publish::{PublishAck, PublishRequest};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

/// POST /bcast: fan one event out to every subscriber.
///
/// Delivery is best-effort: the acknowledgment only says the event was
/// accepted, not how many subscribers got it.
pub async fn publish_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PublishAck>, (StatusCode, Json<PublishAck>)> {
    let event = PublishRequest::from_slice(&body)
        .and_then(PublishRequest::into_event)
        .map_err(|e| {
            warn!(error = %e, bytes = body.len(), "rejected publish");
            (StatusCode::BAD_REQUEST, Json(PublishAck::rejected(e.to_string())))
        })?;

    let report = state.broadcaster.broadcast(&event);
    info!(
        event = event.event_type(),
        seq = report.seq,
        delivered = report.delivered,
        evicted = report.evicted,
        "broadcast"
    );
    Ok(Json(PublishAck::ok()))
}
