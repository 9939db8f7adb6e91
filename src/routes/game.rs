use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::{
            BuzzOut, CreateGameRequest, GameCreateResponse, GameOut, GameUpdate, GameWithTeams,
            HostJoinRequest, PlayerJoinRequest, PlayerOut, TeamOut,
        },
        state::{BuzzRequest, BuzzResponse, GameStateOut, GameStatePatch},
    },
    error::{AppError, ServiceError},
    services::{buzz_service, game_state_service, session_service},
    state::SharedState,
};

/// Session lifecycle, round state and buzz-in routes.
///
/// `/api/games/{id}/join` takes the join code in the `id` segment: sibling
/// routes must share the parameter name.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/games", post(create_game))
        .route("/api/games/{id}", get(get_game).patch(update_game))
        .route("/api/games/{id}/join", post(join_game))
        .route("/api/games/code/{code}", get(get_game_by_code))
        .route("/api/games/code/{code}/host", post(host_join))
        .route("/api/games/{id}/teams", get(list_teams))
        .route("/api/games/{id}/players", get(list_players))
        .route(
            "/api/games/{id}/state",
            get(get_game_state).patch(update_game_state),
        )
        .route("/api/games/{id}/buzzes", get(list_buzzes))
        .route("/api/games/{id}/buzz", post(buzz))
        .route("/api/games/{id}/buzz/reset", post(reset_buzz))
        .route("/api/games/{id}/buzz/enable", post(enable_buzzing))
        .route("/api/games/{id}/buzz/disable", post(disable_buzzing))
}

/// Create a session with its teams and initial round state.
#[utoipa::path(
    post,
    path = "/api/games",
    tag = "games",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Session created", body = GameCreateResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "No unique join code available")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<GameCreateResponse>, AppError> {
    Ok(Json(session_service::create_session(&state, payload).await?))
}

/// Fetch a session and its teams.
#[utoipa::path(
    get,
    path = "/api/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session", body = GameWithTeams),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameWithTeams>, AppError> {
    Ok(Json(session_service::get_session(&state, id).await?))
}

/// Update status, round progression or difficulty.
#[utoipa::path(
    patch,
    path = "/api/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = GameUpdate,
    responses(
        (status = 200, description = "Session updated", body = GameOut),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn update_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<GameUpdate>>,
) -> Result<Json<GameOut>, AppError> {
    Ok(Json(session_service::patch_session(&state, id, payload).await?))
}

/// Join a session as a player of one of its teams.
#[utoipa::path(
    post,
    path = "/api/games/{id}/join",
    tag = "games",
    params(("id" = String, Path, description = "Join code of the session")),
    request_body = PlayerJoinRequest,
    responses(
        (status = 200, description = "Player registered", body = PlayerOut),
        (status = 400, description = "Team does not belong to the session"),
        (status = 404, description = "Unknown join code")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerJoinRequest>>,
) -> Result<Json<PlayerOut>, AppError> {
    Ok(Json(session_service::join_session(&state, &code, payload).await?))
}

/// Fetch a session through its join code.
#[utoipa::path(
    get,
    path = "/api/games/code/{code}",
    tag = "games",
    params(("code" = String, Path, description = "Join code of the session")),
    responses(
        (status = 200, description = "Session", body = GameWithTeams),
        (status = 404, description = "Unknown join code")
    )
)]
pub async fn get_game_by_code(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<GameWithTeams>, AppError> {
    Ok(Json(session_service::get_session_by_code(&state, &code).await?))
}

/// Authenticate as host with the session PIN.
#[utoipa::path(
    post,
    path = "/api/games/code/{code}/host",
    tag = "games",
    params(("code" = String, Path, description = "Join code of the session")),
    request_body = HostJoinRequest,
    responses(
        (status = 200, description = "Host accepted", body = GameWithTeams),
        (status = 403, description = "PIN missing or wrong"),
        (status = 404, description = "Unknown join code")
    )
)]
pub async fn host_join(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<HostJoinRequest>>,
) -> Result<Json<GameWithTeams>, AppError> {
    Ok(Json(session_service::host_join(&state, &code, payload).await?))
}

/// List the teams of a session with their player names.
#[utoipa::path(
    get,
    path = "/api/games/{id}/teams",
    tag = "games",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Teams", body = [TeamOut]),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn list_teams(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TeamOut>>, AppError> {
    Ok(Json(session_service::list_teams(&state, id).await?))
}

/// List the players of a session.
#[utoipa::path(
    get,
    path = "/api/games/{id}/players",
    tag = "games",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Players", body = [PlayerOut]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PlayerOut>>, AppError> {
    Ok(Json(session_service::list_players(&state, id).await?))
}

/// Current round state.
#[utoipa::path(
    get,
    path = "/api/games/{id}/state",
    tag = "state",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Round state", body = GameStateOut),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_game_state(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStateOut>, AppError> {
    Ok(Json(game_state_service::get_game_state(&state, id).await?))
}

/// Partially update the round state; `round_data` is merged.
#[utoipa::path(
    patch,
    path = "/api/games/{id}/state",
    tag = "state",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = GameStatePatch,
    responses(
        (status = 200, description = "Round state updated", body = GameStateOut),
        (status = 400, description = "Invalid patch"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn update_game_state(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<GameStatePatch>>,
) -> Result<Json<GameStateOut>, AppError> {
    Ok(Json(
        game_state_service::patch_game_state(&state, id, payload).await?,
    ))
}

/// Buzz log of a session, oldest first.
#[utoipa::path(
    get,
    path = "/api/games/{id}/buzzes",
    tag = "state",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Recorded buzzes", body = [BuzzOut]),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn list_buzzes(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BuzzOut>>, AppError> {
    Ok(Json(session_service::list_buzzes(&state, id).await?))
}

/// Try to win the current buzz window.
///
/// Losing the race is not an HTTP error: the body reports `success: false`.
#[utoipa::path(
    post,
    path = "/api/games/{id}/buzz",
    tag = "buzz",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = BuzzRequest,
    responses(
        (status = 200, description = "Buzz outcome", body = BuzzResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn buzz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<BuzzRequest>>,
) -> Result<Json<BuzzResponse>, AppError> {
    match buzz_service::buzz(&state, id, payload).await {
        Ok(_) => Ok(Json(BuzzResponse::accepted())),
        Err(ServiceError::InvalidState(_)) => Ok(Json(BuzzResponse::rejected())),
        Err(err) => Err(err.into()),
    }
}

/// Re-arm the buzz window for the next question.
#[utoipa::path(
    post,
    path = "/api/games/{id}/buzz/reset",
    tag = "buzz",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Window open, winner cleared", body = GameStateOut))
)]
pub async fn reset_buzz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStateOut>, AppError> {
    Ok(Json(buzz_service::reset_buzz(&state, id).await?))
}

/// Open a fresh buzz window.
#[utoipa::path(
    post,
    path = "/api/games/{id}/buzz/enable",
    tag = "buzz",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Window open", body = GameStateOut))
)]
pub async fn enable_buzzing(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStateOut>, AppError> {
    Ok(Json(buzz_service::enable_buzzing(&state, id).await?))
}

/// Close the buzz window and clear the winner.
#[utoipa::path(
    post,
    path = "/api/games/{id}/buzz/disable",
    tag = "buzz",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Window closed", body = GameStateOut))
)]
pub async fn disable_buzzing(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStateOut>, AppError> {
    Ok(Json(buzz_service::disable_buzzing(&state, id).await?))
}
