//! Session lifecycle: bootstrap, lookups, joins and round progression.

use std::time::SystemTime;

use serde_json::Map;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        game_store::GameStore,
        models::{GameEntity, GameStateEntity, NewGameRecords, PlayerEntity, TeamEntity},
    },
    dto::{
        game::{
            BuzzOut, CreateGameRequest, GameCreateResponse, GameOut, GameUpdate, GameWithTeams,
            HostJoinRequest, PlayerJoinRequest, PlayerOut, TeamOut,
        },
        validation::normalize_join_code,
    },
    error::ServiceError,
    services::{host_pin, join_code, sync_service},
    state::{
        SharedState,
        game::GameStatus,
        round_data::{GameSetupBlock, RoundData},
    },
};

/// Bootstrap a session with its teams and initial round state.
pub async fn create_session(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameCreateResponse, ServiceError> {
    request.validate()?;
    let game_id = Uuid::new_v4();
    let CreateGameRequest {
        teams,
        difficulty,
        rounds,
        host_pin,
    } = request;

    let now = SystemTime::now();
    let team_entities: Vec<TeamEntity> = teams
        .into_iter()
        .map(|team| TeamEntity {
            id: Uuid::new_v4(),
            game_id,
            name: team.name.trim().to_string(),
            color: team.color,
            score: 0,
            created_at: now,
        })
        .collect();

    let setup = GameSetupBlock {
        rounds: rounds.clone(),
        round_settings: Map::new(),
        difficulty: Some(difficulty),
        host_pin_hash: host_pin.map(|pin| host_pin::hash_host_pin(game_id, &pin)),
        extra: Map::new(),
    };
    let initial_state = GameStateEntity::initial(game_id, RoundData::with_setup(setup), now);

    let created_teams = team_entities.clone();
    let game = sync_service::synchronized(state, game_id, move |store| async move {
        join_code::with_unique_code(
            || join_code::generate(&mut rand::rng()),
            |code| {
                let game = GameEntity {
                    id: game_id,
                    code,
                    status: GameStatus::Waiting,
                    current_round: 0,
                    current_round_type: rounds.first().copied(),
                    difficulty: Some(difficulty),
                    created_at: now,
                    updated_at: now,
                };
                let records = NewGameRecords {
                    game: game.clone(),
                    teams: team_entities.clone(),
                    state: initial_state.clone(),
                };
                let store = store.clone();
                async move { store.create_game(records).await.map(|()| game) }
            },
        )
        .await
    })
    .await?;

    info!(session_id = %game.id, code = %game.code, "session created");

    Ok(GameCreateResponse {
        game: game.into(),
        teams: sync_service::team_views(created_teams, &[]),
    })
}

/// Fetch a session with its teams.
pub async fn get_session(state: &SharedState, id: Uuid) -> Result<GameWithTeams, ServiceError> {
    let store = state.require_game_store().await?;
    let game = require_game(store.as_ref(), id).await?;
    with_teams(store.as_ref(), game).await
}

/// Fetch a session through its join code.
pub async fn get_session_by_code(
    state: &SharedState,
    code: &str,
) -> Result<GameWithTeams, ServiceError> {
    let store = state.require_game_store().await?;
    let game = require_game_by_code(store.as_ref(), code).await?;
    with_teams(store.as_ref(), game).await
}

/// Check the host PIN and return the session view.
pub async fn host_join(
    state: &SharedState,
    code: &str,
    request: HostJoinRequest,
) -> Result<GameWithTeams, ServiceError> {
    request.validate()?;
    let store = state.require_game_store().await?;
    let game = require_game_by_code(store.as_ref(), code).await?;

    let stored_hash = store
        .find_game_state(game.id)
        .await?
        .and_then(|game_state| game_state.round_data)
        .and_then(|data| data.game_setup())
        .and_then(|setup| setup.host_pin_hash)
        .filter(|hash| !hash.is_empty())
        .ok_or_else(|| ServiceError::Forbidden("Host pin not set".into()))?;

    if !host_pin::verify_host_pin(game.id, &request.host_pin, &stored_hash) {
        return Err(ServiceError::Forbidden("Invalid host pin".into()));
    }

    info!(session_id = %game.id, "host joined");
    with_teams(store.as_ref(), game).await
}

/// Register a player in a team of the session identified by `code`.
pub async fn join_session(
    state: &SharedState,
    code: &str,
    request: PlayerJoinRequest,
) -> Result<PlayerOut, ServiceError> {
    request.validate()?;
    let store = state.require_game_store().await?;
    let game = require_game_by_code(store.as_ref(), code).await?;
    let game_id = game.id;

    let player = sync_service::synchronized(state, game_id, move |store| async move {
        let team = store.find_team(request.team_id).await?;
        if !team.is_some_and(|team| team.game_id == game_id) {
            return Err(ServiceError::InvalidInput("Invalid team".into()));
        }

        let now = SystemTime::now();
        let player = PlayerEntity {
            id: Uuid::new_v4(),
            game_id,
            team_id: request.team_id,
            name: request.player_name.trim().to_string(),
            connected: true,
            last_seen: now,
            created_at: now,
        };
        store.save_player(player.clone()).await?;
        Ok(player)
    })
    .await?;

    info!(session_id = %game_id, player_id = %player.id, "player joined");
    Ok(player.into())
}

/// Update status, round index, round type or difficulty of a session.
pub async fn patch_session(
    state: &SharedState,
    id: Uuid,
    update: GameUpdate,
) -> Result<GameOut, ServiceError> {
    update.validate()?;
    let game = sync_service::synchronized(state, id, move |store| async move {
        let mut game = require_game(store.as_ref(), id).await?;
        if let Some(status) = update.status {
            game.status = status;
        }
        if let Some(round) = update.current_round {
            game.current_round = round;
        }
        if let Some(round_type) = update.current_round_type {
            game.current_round_type = round_type;
        }
        if let Some(difficulty) = update.difficulty {
            game.difficulty = difficulty;
        }
        game.updated_at = SystemTime::now();
        store.save_game(game.clone()).await?;
        Ok(game)
    })
    .await?;

    Ok(game.into())
}

/// Teams of a session with their player names.
pub async fn list_teams(state: &SharedState, id: Uuid) -> Result<Vec<TeamOut>, ServiceError> {
    let store = state.require_game_store().await?;
    let (teams, players) = futures::try_join!(store.list_teams(id), store.list_players(id))?;
    if teams.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "game `{id}` or its teams not found"
        )));
    }
    Ok(sync_service::team_views(teams, &players))
}

/// Players of a session with their connectivity.
pub async fn list_players(state: &SharedState, id: Uuid) -> Result<Vec<PlayerOut>, ServiceError> {
    let store = state.require_game_store().await?;
    let players = store.list_players(id).await?;
    Ok(players.into_iter().map(Into::into).collect())
}

/// Buzz log of a session, oldest first.
pub async fn list_buzzes(state: &SharedState, id: Uuid) -> Result<Vec<BuzzOut>, ServiceError> {
    let store = state.require_game_store().await?;
    require_game(store.as_ref(), id).await?;
    let buzzes = store.list_buzzes(id).await?;
    Ok(buzzes.into_iter().map(Into::into).collect())
}

pub(crate) async fn require_game(store: &dyn GameStore, id: Uuid) -> Result<GameEntity, ServiceError> {
    store
        .find_game(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

async fn require_game_by_code(store: &dyn GameStore, code: &str) -> Result<GameEntity, ServiceError> {
    let normalized = normalize_join_code(code);
    if normalized.is_empty() {
        return Err(ServiceError::NotFound("Game not found".into()));
    }
    store
        .find_game_by_code(normalized)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Game not found".into()))
}

async fn with_teams(store: &dyn GameStore, game: GameEntity) -> Result<GameWithTeams, ServiceError> {
    let (teams, players) =
        futures::try_join!(store.list_teams(game.id), store.list_players(game.id))?;
    Ok(GameWithTeams {
        game: game.into(),
        teams: sync_service::team_views(teams, &players),
    })
}
