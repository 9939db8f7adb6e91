use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{game::TeamOut, state::TeamScoreUpdate},
    error::AppError,
    services::game_state_service,
    state::SharedState,
};

/// Team scoring routes.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/teams/{id}/score", post(update_score))
}

/// Add points to a team; the score never drops below zero.
#[utoipa::path(
    post,
    path = "/api/teams/{id}/score",
    tag = "teams",
    params(("id" = Uuid, Path, description = "Team identifier")),
    request_body = TeamScoreUpdate,
    responses(
        (status = 200, description = "Updated team", body = TeamOut),
        (status = 404, description = "Unknown team")
    )
)]
pub async fn update_score(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<TeamScoreUpdate>>,
) -> Result<Json<TeamOut>, AppError> {
    Ok(Json(
        game_state_service::update_team_score(&state, id, payload.points).await?,
    ))
}
