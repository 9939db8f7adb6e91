use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by `/healthcheck` and `/api/health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Configured storage backend.
    pub storage: String,
    /// Sessions that currently have at least one live listener.
    pub live_sessions: usize,
}

impl HealthResponse {
    /// Storage reachable.
    pub fn ok(storage: &str, live_sessions: usize) -> Self {
        Self {
            status: "ok".to_string(),
            storage: storage.to_string(),
            live_sessions,
        }
    }

    /// Running without storage.
    pub fn degraded(storage: &str, live_sessions: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            storage: storage.to_string(),
            live_sessions,
        }
    }
}
