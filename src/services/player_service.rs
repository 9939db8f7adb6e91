//! Player connectivity: disconnect and reconnect flags with their last-seen stamp.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dto::game::PlayerStatusOut,
    error::ServiceError,
    services::sync_service,
    state::SharedState,
};

/// Mark a player as disconnected.
pub async fn disconnect_player(
    state: &SharedState,
    player_id: Uuid,
) -> Result<PlayerStatusOut, ServiceError> {
    set_connected(state, player_id, false).await
}

/// Mark a player as connected again.
pub async fn reconnect_player(
    state: &SharedState,
    player_id: Uuid,
) -> Result<PlayerStatusOut, ServiceError> {
    set_connected(state, player_id, true).await
}

async fn set_connected(
    state: &SharedState,
    player_id: Uuid,
    connected: bool,
) -> Result<PlayerStatusOut, ServiceError> {
    let store = state.require_game_store().await?;
    let game_id = store
        .find_player(player_id)
        .await?
        .map(|player| player.game_id)
        .ok_or_else(|| player_not_found(player_id))?;

    let player = sync_service::synchronized(state, game_id, move |store| async move {
        let mut player = store
            .find_player(player_id)
            .await?
            .ok_or_else(|| player_not_found(player_id))?;
        player.connected = connected;
        player.last_seen = SystemTime::now();
        store.save_player(player.clone()).await?;
        Ok(player)
    })
    .await?;

    info!(session_id = %game_id, player_id = %player_id, connected, "player connectivity changed");
    Ok(player.into())
}

fn player_not_found(player_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("player `{player_id}` not found"))
}
