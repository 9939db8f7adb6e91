//! Nested round state and the recursive patch merge applied to it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::game::{Difficulty, RoundType};

/// Key of the buzz-in sub-document.
pub const TRIVIA_KEY: &str = "trivia";
/// Key of the sub-document holding the round plan and host credential.
pub const GAME_SETUP_KEY: &str = "game_setup";

/// Open-ended round specific state attached to a game state record.
///
/// Known sub-documents (`trivia`, `game_setup`) have typed views below; any
/// other key is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundData(Map<String, Value>);

/// Buzz-in block written by the arbitrator on every accepted buzz.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriviaBlock {
    #[serde(default)]
    pub buzzed_player_id: Option<String>,
    #[serde(default)]
    pub buzzed_player_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Round plan stored when the session is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSetupBlock {
    #[serde(default)]
    pub rounds: Vec<RoundType>,
    #[serde(default)]
    pub round_settings: Map<String, Value>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub host_pin_hash: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoundData {
    /// Wrap an existing JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Initial round data of a new session.
    pub fn with_setup(setup: GameSetupBlock) -> Self {
        let mut map = Map::new();
        map.insert(GAME_SETUP_KEY.into(), to_object(&setup));
        Self(map)
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Return a new document with `patch` merged on top of this one.
    pub fn merged(&self, patch: &Map<String, Value>) -> Self {
        Self(merge_maps(&self.0, patch))
    }

    /// Typed view of the `trivia` block, if present and well formed.
    pub fn trivia(&self) -> Option<TriviaBlock> {
        self.typed_block(TRIVIA_KEY)
    }

    /// Typed view of the `game_setup` block, if present and well formed.
    pub fn game_setup(&self) -> Option<GameSetupBlock> {
        self.typed_block(GAME_SETUP_KEY)
    }

    fn typed_block<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .filter(|value| value.is_object())
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

/// Patch that records the winning player in the `trivia` block.
///
/// Both fields are always written so a missing name clears the previous one.
pub fn trivia_winner_patch(player_id: Option<String>, player_name: Option<String>) -> Map<String, Value> {
    let mut trivia = Map::new();
    trivia.insert(
        "buzzed_player_id".into(),
        player_id.map(Value::String).unwrap_or(Value::Null),
    );
    trivia.insert(
        "buzzed_player_name".into(),
        player_name.map(Value::String).unwrap_or(Value::Null),
    );

    let mut patch = Map::new();
    patch.insert(TRIVIA_KEY.into(), Value::Object(trivia));
    patch
}

/// Recursively merge `patch` onto `base`, returning a new object.
///
/// Recursion happens only when both sides hold an object at the same key.
/// Any other patch value (scalar, array, `null`) replaces the base value.
/// Keys absent from the patch are left untouched.
pub fn merge_maps(base: &Map<String, Value>, patch: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, patch_value) in patch {
        let next = match (merged.get(key), patch_value) {
            (Some(Value::Object(base_obj)), Value::Object(patch_obj)) => {
                Value::Object(merge_maps(base_obj, patch_obj))
            }
            _ => patch_value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}

fn to_object<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn nested_patch_keeps_siblings() {
        let base = object(json!({
            "trivia": {"buzzed_player_id": null, "buzzed_player_name": "Alice"},
            "game_setup": {"rounds": ["trivia-buzz"]}
        }));
        let patch = object(json!({"trivia": {"buzzed_player_id": "p1"}}));

        let merged = merge_maps(&base, &patch);

        assert_eq!(
            Value::Object(merged),
            json!({
                "trivia": {"buzzed_player_id": "p1", "buzzed_player_name": "Alice"},
                "game_setup": {"rounds": ["trivia-buzz"]}
            })
        );
    }

    #[test]
    fn arrays_are_replaced_wholesale() {
        let base = object(json!({"board": {"cells": [1, 2, 3], "size": 4}}));
        let patch = object(json!({"board": {"cells": [9]}}));

        let merged = merge_maps(&base, &patch);

        assert_eq!(Value::Object(merged), json!({"board": {"cells": [9], "size": 4}}));
    }

    #[test]
    fn explicit_null_clears_but_absence_preserves() {
        let base = object(json!({"trivia": {"a": 1, "b": 2}, "other": true}));
        let patch = object(json!({"trivia": {"a": null}}));

        let merged = merge_maps(&base, &patch);

        assert_eq!(
            Value::Object(merged),
            json!({"trivia": {"a": null, "b": 2}, "other": true})
        );
    }

    #[test]
    fn object_replaces_scalar_and_scalar_replaces_object() {
        let base = object(json!({"x": 1, "y": {"deep": true}}));
        let patch = object(json!({"x": {"now": "object"}, "y": "flat", "z": [1]}));

        let merged = merge_maps(&base, &patch);

        assert_eq!(
            Value::Object(merged),
            json!({"x": {"now": "object"}, "y": "flat", "z": [1]})
        );
    }

    #[test]
    fn merge_does_not_touch_the_base() {
        let base = RoundData::from_map(object(json!({"trivia": {"a": 1}})));
        let before = base.clone();

        let merged = base.merged(&object(json!({"trivia": {"a": 2}})));

        assert_eq!(base, before);
        assert_ne!(merged, before);
    }

    #[test]
    fn typed_views_read_known_blocks() {
        let setup = GameSetupBlock {
            rounds: vec![RoundType::TriviaBuzz, RoundType::Connect4],
            difficulty: Some(Difficulty::Hard),
            host_pin_hash: Some("abc".into()),
            ..Default::default()
        };
        let data = RoundData::with_setup(setup.clone())
            .merged(&trivia_winner_patch(Some("p1".into()), None));

        assert_eq!(data.game_setup(), Some(setup));
        let trivia = data.trivia().unwrap();
        assert_eq!(trivia.buzzed_player_id.as_deref(), Some("p1"));
        assert_eq!(trivia.buzzed_player_name, None);
    }

    #[test]
    fn winner_patch_clears_stale_name() {
        let data = RoundData::from_map(object(json!({
            "trivia": {"buzzed_player_id": "old", "buzzed_player_name": "Alice", "score_hint": 3}
        })));

        let merged = data.merged(&trivia_winner_patch(Some("p2".into()), None));

        assert_eq!(
            Value::Object(merged.into_map()),
            json!({"trivia": {"buzzed_player_id": "p2", "buzzed_player_name": null, "score_hint": 3}})
        );
    }
}
