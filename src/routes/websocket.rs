use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    services::{session_service, websocket_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/ws/games/{id}",
    tag = "listeners",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket; snapshots follow"),
        (status = 404, description = "Unknown session")
    )
)]
/// Upgrade the HTTP connection into a snapshot stream for one session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    session_service::get_session(&state, id).await?;
    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(state, id, socket)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws/games/{id}", get(ws_handler))
}
