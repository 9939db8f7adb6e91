use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{BuzzEntity, GameEntity, PlayerEntity, TeamEntity},
    dto::{
        format_system_time,
        validation::{validate_display_name, validate_host_pin},
    },
    state::game::{Difficulty, GameStatus, RoundType},
};

/// Payload used to bootstrap a brand-new game session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(length(min = 1, message = "at least one team is required"), nested)]
    pub teams: Vec<TeamCreate>,
    pub difficulty: Difficulty,
    #[validate(length(min = 1, message = "at least one round is required"))]
    pub rounds: Vec<RoundType>,
    /// Optional secret the host types to reclaim the host view.
    #[serde(default)]
    #[validate(custom(function = "validate_host_pin"))]
    pub host_pin: Option<String>,
}

/// Incoming team definition for the game bootstrap.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct TeamCreate {
    #[validate(length(min = 1, max = 100), custom(function = "validate_display_name"))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub color: String,
}

/// Partial update of the session record. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct GameUpdate {
    #[serde(default)]
    pub status: Option<GameStatus>,
    #[serde(default)]
    pub current_round: Option<u32>,
    /// `null` clears the round type.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<RoundType>)]
    pub current_round_type: Option<Option<RoundType>>,
    /// `null` clears the difficulty.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Difficulty>)]
    pub difficulty: Option<Option<Difficulty>>,
}

/// Player registration through the join code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlayerJoinRequest {
    #[validate(length(min = 1, max = 100), custom(function = "validate_display_name"))]
    pub player_name: String,
    pub team_id: Uuid,
}

/// Host credential check through the join code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct HostJoinRequest {
    #[validate(custom(function = "validate_host_pin"))]
    pub host_pin: String,
}

/// Public projection of a session record.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameOut {
    pub id: Uuid,
    pub code: String,
    pub status: GameStatus,
    pub current_round: u32,
    pub current_round_type: Option<RoundType>,
    pub difficulty: Option<Difficulty>,
    pub created_at: String,
    pub updated_at: String,
}

/// Public projection of a team, with the names of its players in join order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamOut {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub score: i32,
    pub players: Vec<String>,
}

/// Response of the session bootstrap.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameCreateResponse {
    pub game: GameOut,
    pub teams: Vec<TeamOut>,
}

/// Session with its teams, returned by lookups.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameWithTeams {
    pub game: GameOut,
    pub teams: Vec<TeamOut>,
}

/// Public projection of a player, including connectivity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerOut {
    pub id: Uuid,
    pub name: String,
    pub team_id: Uuid,
    pub game_id: Uuid,
    pub connected: bool,
    pub last_seen: String,
}

/// Result of a connectivity change.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerStatusOut {
    pub id: Uuid,
    pub name: String,
    pub team_id: Uuid,
    pub game_id: Uuid,
    pub connected: bool,
}

/// Entry of the buzz log.
#[derive(Debug, Serialize, ToSchema)]
pub struct BuzzOut {
    pub id: Uuid,
    pub team_id: Uuid,
    pub player_id: Option<Uuid>,
    pub question_text: Option<String>,
    pub was_first: bool,
    pub created_at: String,
}

impl From<GameEntity> for GameOut {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            code: game.code,
            status: game.status,
            current_round: game.current_round,
            current_round_type: game.current_round_type,
            difficulty: game.difficulty,
            created_at: format_system_time(game.created_at),
            updated_at: format_system_time(game.updated_at),
        }
    }
}

impl TeamOut {
    /// Build the team view, picking the names of `players` that belong to it.
    pub fn with_players(team: TeamEntity, players: &[PlayerEntity]) -> Self {
        let names = players
            .iter()
            .filter(|player| player.team_id == team.id)
            .map(|player| player.name.clone())
            .collect();
        Self {
            id: team.id,
            name: team.name,
            color: team.color,
            score: team.score,
            players: names,
        }
    }
}

impl From<PlayerEntity> for PlayerOut {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name,
            team_id: player.team_id,
            game_id: player.game_id,
            connected: player.connected,
            last_seen: format_system_time(player.last_seen),
        }
    }
}

impl From<PlayerEntity> for PlayerStatusOut {
    fn from(player: PlayerEntity) -> Self {
        Self {
            id: player.id,
            name: player.name,
            team_id: player.team_id,
            game_id: player.game_id,
            connected: player.connected,
        }
    }
}

impl From<BuzzEntity> for BuzzOut {
    fn from(buzz: BuzzEntity) -> Self {
        Self {
            id: buzz.id,
            team_id: buzz.team_id,
            player_id: buzz.player_id,
            question_text: buzz.question_text,
            was_first: buzz.was_first,
            created_at: format_system_time(buzz.created_at),
        }
    }
}
