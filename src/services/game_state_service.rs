//! Round state patches and team scores.

use std::time::SystemTime;

use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{game_store::GameStore, models::GameStateEntity},
    dto::{
        game::TeamOut,
        state::{GameStateOut, GameStatePatch},
    },
    error::ServiceError,
    services::sync_service,
    state::{
        SharedState,
        buzz::{BuzzEvent, BuzzWindow},
    },
};

/// Current round state of a session.
pub async fn get_game_state(state: &SharedState, id: Uuid) -> Result<GameStateOut, ServiceError> {
    let store = state.require_game_store().await?;
    let game_state = require_game_state(store.as_ref(), id).await?;
    Ok(game_state.into())
}

/// Apply a partial update to the round state of a session.
pub async fn patch_game_state(
    state: &SharedState,
    id: Uuid,
    patch: GameStatePatch,
) -> Result<GameStateOut, ServiceError> {
    patch.validate()?;

    let updated = sync_service::synchronized(state, id, move |store| async move {
        let current = require_game_state(store.as_ref(), id).await?;
        let next = apply_state_patch(&current, patch, SystemTime::now())?;
        store.save_game_state(next.clone()).await?;
        Ok(next)
    })
    .await?;

    Ok(updated.into())
}

/// Add `points` to a team score, flooring the result at zero.
pub async fn update_team_score(
    state: &SharedState,
    team_id: Uuid,
    points: i32,
) -> Result<TeamOut, ServiceError> {
    let store = state.require_game_store().await?;
    let game_id = store
        .find_team(team_id)
        .await?
        .map(|team| team.game_id)
        .ok_or_else(|| team_not_found(team_id))?;

    let (team, players) = sync_service::synchronized(state, game_id, move |store| async move {
        let mut team = store
            .find_team(team_id)
            .await?
            .ok_or_else(|| team_not_found(team_id))?;
        team.score = floored_score(team.score, points);
        store.save_team(team.clone()).await?;
        let players = store.list_players(team.game_id).await?;
        Ok((team, players))
    })
    .await?;

    Ok(TeamOut::with_players(team, &players))
}

/// Apply `points` to `current`, never going below zero.
pub fn floored_score(current: i32, points: i32) -> i32 {
    current.saturating_add(points).max(0)
}

/// Compute the state reached by applying `patch` to `current`.
///
/// Absent fields are kept, explicit nulls clear, `round_data` is merged.
/// Opening the buzz window clears the winner; a result holding a winner while
/// the window is open is rejected.
pub fn apply_state_patch(
    current: &GameStateEntity,
    patch: GameStatePatch,
    now: SystemTime,
) -> Result<GameStateEntity, ServiceError> {
    let mut next = current.clone();

    if let Some(question) = patch.current_question {
        next.current_question = question;
    }
    if let Some(category) = patch.current_category {
        next.current_category = category;
    }
    if let Some(points) = patch.current_points {
        next.current_points = points;
    }
    if let Some(remaining) = patch.time_remaining {
        next.time_remaining = remaining;
    }
    if let Some(turn) = patch.current_turn_team_id {
        next.current_turn_team_id = turn;
    }
    if let Some(round_data) = patch.round_data {
        next.round_data = round_data.map(|partial| {
            next.round_data
                .take()
                .unwrap_or_default()
                .merged(&partial)
        });
    }
    if let Some(winner) = patch.buzzed_team_id {
        next.buzzed_team_id = winner;
    }

    match patch.can_buzz {
        Some(true) => {
            let window = BuzzWindow::of(&next)
                .next(BuzzEvent::Enable)
                .map_err(ServiceError::from)?;
            window.write_to(&mut next);
        }
        Some(false) => next.can_buzz = false,
        None => {}
    }

    if next.can_buzz && next.buzzed_team_id.is_some() {
        return Err(ServiceError::InvalidInput(
            "buzzed_team_id must be empty while can_buzz is true".into(),
        ));
    }

    next.updated_at = now;
    Ok(next)
}

pub(crate) async fn require_game_state(
    store: &dyn GameStore,
    id: Uuid,
) -> Result<GameStateEntity, ServiceError> {
    store
        .find_game_state(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game state for `{id}` not found")))
}

fn team_not_found(team_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("team `{team_id}` not found"))
}
