use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::{
    game::{Difficulty, GameStatus, RoundType},
    round_data::RoundData,
};

/// Root record of a running game session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Eight letter join code typed by players.
    pub code: String,
    /// Lifecycle status of the session.
    pub status: GameStatus,
    /// Index of the round currently being played.
    pub current_round: u32,
    /// Game mode of the current round.
    pub current_round_type: Option<RoundType>,
    /// Default difficulty chosen at creation.
    pub difficulty: Option<Difficulty>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game record was updated.
    pub updated_at: SystemTime,
}

/// Team competing inside a game session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Stable identifier for the team.
    pub id: Uuid,
    /// Owning game session.
    pub game_id: Uuid,
    /// Display name chosen for the team.
    pub name: String,
    /// Display color (free-form CSS color or palette key).
    pub color: String,
    /// Current score, never negative.
    pub score: i32,
    /// Creation timestamp, used to order teams.
    pub created_at: SystemTime,
}

/// Player device registered in a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Owning game session.
    pub game_id: Uuid,
    /// Team the player joined.
    pub team_id: Uuid,
    /// Display name typed by the player.
    pub name: String,
    /// Whether the player device is currently considered connected.
    pub connected: bool,
    /// Last time the connectivity flag changed.
    pub last_seen: SystemTime,
    /// Creation timestamp, used to order players.
    pub created_at: SystemTime,
}

/// Shared round state of a game session (exactly one per game).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameStateEntity {
    /// Owning game session.
    pub game_id: Uuid,
    pub current_question: Option<String>,
    pub current_category: Option<String>,
    pub current_points: Option<i32>,
    pub time_remaining: Option<i32>,
    /// Whether the buzz window is open.
    pub can_buzz: bool,
    /// Team holding the buzz-in lock; only set while `can_buzz` is false.
    pub buzzed_team_id: Option<Uuid>,
    /// Team whose turn it is in turn-based rounds.
    pub current_turn_team_id: Option<Uuid>,
    /// Round specific nested state.
    pub round_data: Option<RoundData>,
    /// Last time the state was updated.
    pub updated_at: SystemTime,
}

impl GameStateEntity {
    /// Fresh state for a newly created game: buzzing locked, nothing displayed.
    pub fn initial(game_id: Uuid, round_data: RoundData, now: SystemTime) -> Self {
        Self {
            game_id,
            current_question: None,
            current_category: None,
            current_points: None,
            time_remaining: None,
            can_buzz: false,
            buzzed_team_id: None,
            current_turn_team_id: None,
            round_data: Some(round_data),
            updated_at: now,
        }
    }
}

/// Append-only log entry of a successful buzz-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuzzEntity {
    pub id: Uuid,
    pub game_id: Uuid,
    pub team_id: Uuid,
    pub player_id: Option<Uuid>,
    /// Question displayed when the buzz was accepted.
    pub question_text: Option<String>,
    pub was_first: bool,
    pub created_at: SystemTime,
}

/// Records created together when a session is bootstrapped.
#[derive(Debug, Clone)]
pub struct NewGameRecords {
    pub game: GameEntity,
    pub teams: Vec<TeamEntity>,
    pub state: GameStateEntity,
}
