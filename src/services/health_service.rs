use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report degraded mode, storage backend and live session count, logging storage connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let storage = state.config().storage.as_str();
    let live_sessions = state.listeners().session_count();
    if state.is_degraded() {
        HealthResponse::degraded(storage, live_sessions)
    } else {
        HealthResponse::ok(storage, live_sessions)
    }
}
