//! Serialized per-session mutations followed by a snapshot rebroadcast.

use std::{future::Future, sync::Arc};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        models::{PlayerEntity, TeamEntity},
    },
    dto::{
        game::TeamOut,
        snapshot::{SessionMessage, SessionSnapshot},
    },
    error::ServiceError,
    state::{Listener, SharedState},
};

/// Run a mutation of `session_id` and publish the resulting snapshot.
///
/// `work` runs while holding the session gate and under the mutation timeout.
/// On success the snapshot is assembled and enqueued to every listener before
/// the gate is released, so listeners observe mutations in commit order. On
/// failure nothing is published.
pub async fn synchronized<F, Fut, T>(
    state: &SharedState,
    session_id: Uuid,
    work: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(Arc<dyn GameStore>) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let store = state.require_game_store().await?;
    let gate = state.session_gate(session_id);

    let result = {
        let _guard = gate.lock().await;
        let outcome = state.with_mutation_timeout(work(store.clone())).await;
        if outcome.is_ok() {
            publish_snapshot(state, store.as_ref(), session_id).await;
        }
        outcome
    };

    drop(gate);
    state.release_session_gate(session_id);
    result
}

/// Register `listener` and send it the current snapshot.
///
/// Runs under the session gate so the initial snapshot can never overtake a
/// snapshot published by a concurrent mutation.
pub async fn attach_listener(
    state: &SharedState,
    session_id: Uuid,
    listener: &Listener,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    let gate = state.session_gate(session_id);

    let result = {
        let _guard = gate.lock().await;
        match build_snapshot(store.as_ref(), session_id).await {
            Ok(Some(snapshot)) => {
                state.listeners().subscribe(session_id, listener);
                match serde_json::to_string(&SessionMessage::Snapshot(snapshot)) {
                    Ok(json) => {
                        let _ = listener.tx.send(json.into());
                    }
                    Err(err) => {
                        warn!(session_id = %session_id, error = %err, "failed to serialize initial snapshot")
                    }
                }
                Ok(())
            }
            Ok(None) => Err(ServiceError::NotFound(format!(
                "game `{session_id}` not found"
            ))),
            Err(err) => Err(err),
        }
    };

    drop(gate);
    state.release_session_gate(session_id);
    result
}

/// Remove a listener from the session.
pub fn detach_listener(state: &SharedState, session_id: Uuid, listener: &Listener) {
    state.listeners().unsubscribe(session_id, listener.id);
}

/// Build and publish the snapshot of a session, returning the number of listeners reached.
///
/// Failures are logged and never surfaced: the mutation already committed.
pub async fn publish_snapshot(state: &SharedState, store: &dyn GameStore, session_id: Uuid) -> usize {
    if state.listeners().listener_count(session_id) == 0 {
        debug!(session_id = %session_id, "no listeners; skipping snapshot");
        return 0;
    }

    match build_snapshot(store, session_id).await {
        Ok(Some(snapshot)) => state
            .listeners()
            .publish(session_id, &SessionMessage::Snapshot(snapshot)),
        Ok(None) => {
            warn!(session_id = %session_id, "session vanished before snapshot");
            0
        }
        Err(err) => {
            warn!(session_id = %session_id, error = %err, "failed to build snapshot");
            0
        }
    }
}

/// Assemble the full view of a session, or `None` if it does not exist.
pub async fn build_snapshot(
    store: &dyn GameStore,
    session_id: Uuid,
) -> Result<Option<SessionSnapshot>, ServiceError> {
    let Some(game) = store.find_game(session_id).await? else {
        return Ok(None);
    };

    let (teams, players, game_state) = futures::try_join!(
        store.list_teams(session_id),
        store.list_players(session_id),
        store.find_game_state(session_id),
    )?;

    Ok(Some(SessionSnapshot {
        game: game.into(),
        teams: team_views(teams, &players),
        game_state: game_state.map(Into::into),
        players: players.into_iter().map(Into::into).collect(),
    }))
}

/// Team projections carrying the names of their players.
pub fn team_views(teams: Vec<TeamEntity>, players: &[PlayerEntity]) -> Vec<TeamOut> {
    teams
        .into_iter()
        .map(|team| TeamOut::with_players(team, players))
        .collect()
}
