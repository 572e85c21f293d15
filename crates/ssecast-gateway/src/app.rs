use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use ssecast_core::config::RelayConfig;
use ssecast_protocol::routes;
use std::sync::Arc;
use std::time::Duration;

use crate::shutdown::ShutdownCoordinator;
use crate::sse::{EventBroadcaster, SubscriberRegistry};

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: RelayConfig,
    pub registry: Arc<SubscriberRegistry>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub shutdown: ShutdownCoordinator,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        let registry = Arc::new(SubscriberRegistry::new(config.relay.subscriber_queue));
        let broadcaster = Arc::new(EventBroadcaster::new(Arc::clone(&registry)));
        let shutdown = ShutdownCoordinator::new(
            Arc::clone(&registry),
            Duration::from_millis(config.relay.shutdown_grace_ms),
        );
        Self {
            config,
            registry,
            broadcaster,
            shutdown,
        }
    }

    pub fn keepalive_period(&self) -> Duration {
        Duration::from_secs(self.config.relay.keepalive_secs)
    }
}

/// Assemble the full Axum router.
///
/// Handlers read the peer address through `ConnectInfo<SocketAddr>`, so the
/// router must be served with connect info attached.
pub fn build_router(state: Arc<AppState>) -> Router {
    let control = Router::new()
        .route(routes::BCAST, post(crate::http::publish::publish_handler))
        .route(routes::CLIENTS, get(crate::http::clients::clients_handler))
        .route(routes::EXIT, get(crate::http::exit::exit_handler))
        .route_layer(middleware::from_fn(crate::http::origin::require_loopback));

    Router::new()
        .route(routes::SSE, get(crate::sse::connection::sse_handler))
        .merge(control)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
