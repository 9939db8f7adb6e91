use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{dao::models::GameStateEntity, dto::format_system_time};

/// Public projection of the shared round state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStateOut {
    pub game_id: Uuid,
    pub current_question: Option<String>,
    pub current_category: Option<String>,
    pub current_points: Option<i32>,
    pub time_remaining: Option<i32>,
    pub can_buzz: bool,
    pub buzzed_team_id: Option<Uuid>,
    pub current_turn_team_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub round_data: Option<Map<String, Value>>,
    pub updated_at: String,
}

/// Partial update of the shared round state.
///
/// Absent fields are left untouched; an explicit `null` clears the field.
/// `round_data` is merged recursively into the stored document, and `null`
/// clears the whole document.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GameStatePatch {
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub current_question: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub current_category: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub current_points: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub time_remaining: Option<Option<i32>>,
    #[serde(default)]
    pub can_buzz: Option<bool>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub buzzed_team_id: Option<Option<Uuid>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub current_turn_team_id: Option<Option<Uuid>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Object>)]
    pub round_data: Option<Option<Map<String, Value>>>,
}

impl Validate for GameStatePatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(Some(remaining)) = self.time_remaining {
            if remaining < 0 {
                let mut err = ValidationError::new("time_remaining_negative");
                err.message = Some("time_remaining must not be negative".into());
                errors.add("time_remaining", err);
            }
        }

        // A winner cannot be named in the same patch that opens a window.
        if self.can_buzz == Some(true) && matches!(self.buzzed_team_id, Some(Some(_))) {
            let mut err = ValidationError::new("buzzed_team_while_open");
            err.message = Some("buzzed_team_id must be empty while can_buzz is true".into());
            errors.add("buzzed_team_id", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Score change applied to a team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TeamScoreUpdate {
    /// Signed delta; the resulting score never drops below zero.
    pub points: i32,
}

/// Buzz-in request from a player device.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BuzzRequest {
    pub team_id: Uuid,
    #[serde(default)]
    pub player_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub player_name: Option<String>,
    #[serde(default)]
    pub question_text: Option<String>,
}

/// Outcome of a buzz-in request.
#[derive(Debug, Serialize, ToSchema)]
pub struct BuzzResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BuzzResponse {
    /// The buzz won the window.
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// The window was not open.
    pub fn rejected() -> Self {
        Self {
            success: false,
            message: Some("Cannot buzz right now".into()),
        }
    }
}

impl From<GameStateEntity> for GameStateOut {
    fn from(state: GameStateEntity) -> Self {
        Self {
            game_id: state.game_id,
            current_question: state.current_question,
            current_category: state.current_category,
            current_points: state.current_points,
            time_remaining: state.time_remaining,
            can_buzz: state.can_buzz,
            buzzed_team_id: state.buzzed_team_id,
            current_turn_team_id: state.current_turn_team_id,
            round_data: state.round_data.map(|data| data.into_map()),
            updated_at: format_system_time(state.updated_at),
        }
    }
}
