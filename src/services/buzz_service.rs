//! Buzz-in attempts and window control.

use std::time::SystemTime;

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{game::BuzzOut, state::{BuzzRequest, GameStateOut}},
    error::ServiceError,
    services::{game_state_service::require_game_state, sync_service},
    state::{
        SharedState,
        buzz::{BuzzAttempt, BuzzEvent, apply_window_event, resolve_buzz},
    },
};

/// Arbitrate a buzz attempt, recording the winning event.
///
/// Fails with [`ServiceError::InvalidState`] when the window is not open; in
/// that case nothing is written and nothing is published.
pub async fn buzz(
    state: &SharedState,
    id: Uuid,
    request: BuzzRequest,
) -> Result<BuzzOut, ServiceError> {
    request.validate()?;

    let attempt = BuzzAttempt {
        team_id: request.team_id,
        player_id: request.player_id,
        player_name: request.player_name,
        question_text: request.question_text,
    };

    let recorded = sync_service::synchronized(state, id, move |store| async move {
        let current = require_game_state(store.as_ref(), id).await?;

        let team = store.find_team(attempt.team_id).await?;
        if !team.is_some_and(|team| team.game_id == id) {
            return Err(ServiceError::InvalidInput("Invalid team".into()));
        }

        let player = match attempt.player_id {
            Some(player_id) => store
                .find_player(player_id)
                .await?
                .filter(|player| player.game_id == id),
            None => None,
        };

        let outcome = resolve_buzz(&current, &attempt, player.as_ref(), SystemTime::now())
            .inspect_err(|err| {
                debug!(session_id = %id, team_id = %attempt.team_id, window = ?err.window, "buzz rejected")
            })?;
        let buzz = outcome.buzz.clone();
        store.record_buzz(outcome.state, outcome.buzz).await?;
        Ok(buzz)
    })
    .await?;

    info!(session_id = %id, team_id = %recorded.team_id, "buzz accepted");
    Ok(recorded.into())
}

/// Re-arm the window for the next question: open with no winner.
pub async fn reset_buzz(state: &SharedState, id: Uuid) -> Result<GameStateOut, ServiceError> {
    apply_event(state, id, BuzzEvent::Reset { open: true }).await
}

/// Open a fresh buzz window.
pub async fn enable_buzzing(state: &SharedState, id: Uuid) -> Result<GameStateOut, ServiceError> {
    apply_event(state, id, BuzzEvent::Enable).await
}

/// Close the window and forget the winner.
pub async fn disable_buzzing(state: &SharedState, id: Uuid) -> Result<GameStateOut, ServiceError> {
    apply_event(state, id, BuzzEvent::Disable).await
}

async fn apply_event(
    state: &SharedState,
    id: Uuid,
    event: BuzzEvent,
) -> Result<GameStateOut, ServiceError> {
    let updated = sync_service::synchronized(state, id, move |store| async move {
        let current = require_game_state(store.as_ref(), id).await?;
        let next = apply_window_event(&current, event, SystemTime::now())?;
        store.save_game_state(next.clone()).await?;
        Ok(next)
    })
    .await?;

    debug!(session_id = %id, event = ?event, "buzz window updated");
    Ok(updated.into())
}
