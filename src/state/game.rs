use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a game session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Lobby: teams are being filled, no round started yet.
    #[default]
    Waiting,
    /// Rounds are being played.
    #[serde(alias = "active")]
    InProgress,
    /// Final scores are shown.
    #[serde(alias = "finished")]
    Completed,
}

/// Difficulty level applied to generated questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    Medium,
    #[default]
    MediumHard,
    Hard,
}

impl Difficulty {
    /// Wire representation, also used verbatim inside generation prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::MediumHard => "medium-hard",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game mode played during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RoundType {
    /// Classic question/buzz-in round.
    TriviaBuzz,
    /// Rapid fire questions.
    Lightning,
    QuickBuild,
    /// 4x4 board of category questions.
    #[serde(rename = "connect-4")]
    Connect4,
    /// Closest numeric answer wins.
    GuessNumber,
    BlindDraw,
    DumpCharades,
}

impl RoundType {
    /// Wire representation of the round type.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundType::TriviaBuzz => "trivia-buzz",
            RoundType::Lightning => "lightning",
            RoundType::QuickBuild => "quick-build",
            RoundType::Connect4 => "connect-4",
            RoundType::GuessNumber => "guess-number",
            RoundType::BlindDraw => "blind-draw",
            RoundType::DumpCharades => "dump-charades",
        }
    }
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_legacy_aliases() {
        let active: GameStatus = serde_json::from_str("\"active\"").unwrap();
        let finished: GameStatus = serde_json::from_str("\"finished\"").unwrap();
        assert_eq!(active, GameStatus::InProgress);
        assert_eq!(finished, GameStatus::Completed);
        assert_eq!(
            serde_json::to_string(&GameStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn round_type_wire_names_match_display() {
        for round in [
            RoundType::TriviaBuzz,
            RoundType::Lightning,
            RoundType::QuickBuild,
            RoundType::Connect4,
            RoundType::GuessNumber,
            RoundType::BlindDraw,
            RoundType::DumpCharades,
        ] {
            let json = serde_json::to_string(&round).unwrap();
            assert_eq!(json, format!("\"{round}\""));
        }
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        assert!(serde_json::from_str::<Difficulty>("\"impossible\"").is_err());
        let parsed: Difficulty = serde_json::from_str("\"medium-hard\"").unwrap();
        assert_eq!(parsed, Difficulty::MediumHard);
    }
}
