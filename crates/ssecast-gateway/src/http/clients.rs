use axum::extract::State;
use std::sync::Arc;

use crate::app::AppState;

/// GET /clients: current subscriber count as plain text.
pub async fn clients_handler(State(state): State<Arc<AppState>>) -> String {
    state.registry.count().to_string()
}
