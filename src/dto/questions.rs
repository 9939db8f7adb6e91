use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::game::{Difficulty, RoundType};

/// Per-round generation settings, as sent by the host setup screen.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoundSettings {
    #[validate(range(min = 1, max = 50))]
    pub trivia_buzz_questions: Option<u32>,
    pub trivia_buzz_difficulty: Option<Difficulty>,
    pub lightning_seconds: Option<u32>,
    pub lightning_difficulty: Option<Difficulty>,
    pub quick_build_seconds: Option<u32>,
    pub guess_number_seconds: Option<u32>,
    #[validate(range(min = 1, max = 50))]
    pub guess_number_questions: Option<u32>,
    pub guess_number_difficulty: Option<Difficulty>,
    #[validate(length(max = 4))]
    pub connect4_themes: Option<Vec<String>>,
    pub connect4_difficulty: Option<Difficulty>,
    pub blind_draw_seconds: Option<u32>,
    pub blind_draw_difficulty: Option<Difficulty>,
    pub blind_draw_word_count: Option<u32>,
    pub dump_charades_seconds: Option<u32>,
    pub dump_charades_difficulty: Option<Difficulty>,
    pub dump_charades_category: Option<String>,
}

/// Request to generate content for a set of rounds.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GenerateQuestionsRequest {
    pub rounds: Vec<RoundType>,
    #[serde(rename = "roundSettings", default)]
    #[validate(nested)]
    pub round_settings: RoundSettings,
}

/// One generated question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionOut {
    pub id: String,
    pub text: String,
    pub answer: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: Option<String>,
}

/// Estimation question with an integer answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GuessNumberQuestion {
    pub question: String,
    pub answer: i64,
}

/// Question placed on the connect-4 board.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Connect4Question {
    pub column: u8,
    pub row: u8,
    pub question: QuestionOut,
}

/// Generated content, one entry per requested round type.
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestions {
    pub trivia_buzz: Option<Vec<QuestionOut>>,
    pub lightning: Option<Vec<QuestionOut>>,
    pub guess_number: Option<Vec<GuessNumberQuestion>>,
    #[serde(rename = "connect4")]
    pub connect4: Option<Vec<Connect4Question>>,
    pub blind_draw: Option<Vec<String>>,
    pub dump_charades: Option<Vec<String>>,
}

/// Request to replace one generated item.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegenerateQuestionRequest {
    pub round_type: RoundType,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(range(max = 3))]
    pub column: Option<u8>,
    #[serde(default)]
    #[validate(range(max = 3))]
    pub row: Option<u8>,
}

/// Replacement item; exactly one of the optional fields is set.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegenerateQuestionResponse {
    pub round_type: RoundType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guess_number: Option<GuessNumberQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect4: Option<Connect4Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
}

impl RegenerateQuestionResponse {
    /// Empty response for `round_type`, to be filled by the caller.
    pub fn empty(round_type: RoundType) -> Self {
        Self {
            round_type,
            question: None,
            guess_number: None,
            connect4: None,
            word: None,
        }
    }
}
