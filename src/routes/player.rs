use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::game::PlayerStatusOut, error::AppError, services::player_service, state::SharedState,
};

/// Player connectivity routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/players/{id}/disconnect", post(disconnect_player))
        .route("/api/players/{id}/reconnect", post(reconnect_player))
}

/// Flag a player as disconnected.
#[utoipa::path(
    post,
    path = "/api/players/{id}/disconnect",
    tag = "players",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Player disconnected", body = PlayerStatusOut),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn disconnect_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerStatusOut>, AppError> {
    Ok(Json(player_service::disconnect_player(&state, id).await?))
}

/// Flag a player as connected again.
#[utoipa::path(
    post,
    path = "/api/players/{id}/reconnect",
    tag = "players",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Player reconnected", body = PlayerStatusOut),
        (status = 404, description = "Unknown player")
    )
)]
pub async fn reconnect_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerStatusOut>, AppError> {
    Ok(Json(player_service::reconnect_player(&state, id).await?))
}
