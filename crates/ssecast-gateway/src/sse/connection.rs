use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::Stream;
use ssecast_core::types::SubscriberId;
use ssecast_protocol::frames::BroadcastEvent;
use tokio::sync::mpsc;
use tracing::info;

use crate::app::AppState;
use crate::sse::registry::SubscriberRegistry;

/// Axum handler: opens a long-lived event stream at GET /sse.
pub async fn sse_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let (id, rx) = state.registry.register(peer);
    info!(subscriber_id = %id, peer = %peer, "SSE connection");

    let guard = SubscriberGuard {
        id,
        peer,
        registry: Arc::clone(&state.registry),
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Body::from_stream(subscriber_stream(guard, rx)),
    )
        .into_response()
}

/// Body of one subscriber response: the welcome frame, then whatever the
/// broadcaster queues. Ends when the queue's sender is dropped (eviction or
/// shutdown); dropping it (client went away) deregisters via the guard.
fn subscriber_stream(
    guard: SubscriberGuard,
    mut rx: mpsc::Receiver<Bytes>,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    async_stream::stream! {
        let _guard = guard;
        yield Ok(BroadcastEvent::welcome().encode());
        while let Some(frame) = rx.recv().await {
            yield Ok(frame);
        }
    }
}

/// Removes the subscriber from the registry when its response body is dropped.
struct SubscriberGuard {
    id: SubscriberId,
    peer: SocketAddr,
    registry: Arc<SubscriberRegistry>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let removed = self.registry.remove(&self.id);
        info!(
            subscriber_id = %self.id,
            peer = %self.peer,
            evicted = !removed,
            "SSE disconnection"
        );
    }
}
