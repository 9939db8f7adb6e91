use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{
    game::{GameOut, PlayerOut, TeamOut},
    state::GameStateOut,
};

/// Message pushed to every listener of a session after each mutation.
///
/// Serialized as `{"type": "snapshot", "data": {...}}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionMessage {
    /// Full view of the session.
    Snapshot(SessionSnapshot),
}

/// Self-consistent view of one session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub game: GameOut,
    pub teams: Vec<TeamOut>,
    pub game_state: Option<GameStateOut>,
    pub players: Vec<PlayerOut>,
}
