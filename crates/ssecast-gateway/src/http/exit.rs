use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;

/// GET /exit: schedule termination if nobody is subscribed, else 503.
///
/// Evaluated once per call. Callers that want to drain must poll.
pub async fn exit_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.shutdown.request() {
        Ok(outcome) => {
            info!(?outcome, "shutdown accepted");
            (StatusCode::OK, "OK").into_response()
        }
        Err(refused) => {
            warn!(subscribers = refused.subscribers, "shutdown refused, subscribers connected");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
