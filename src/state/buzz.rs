//! Buzz-in window arbitration.
//!
//! The window is derived from the `can_buzz` / `buzzed_team_id` pair of a
//! [`GameStateEntity`]. Transitions are pure; callers run them inside the
//! per-session serialized section so that two attempts never both observe
//! [`BuzzWindow::Open`].

use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{BuzzEntity, GameStateEntity, PlayerEntity},
    state::round_data::trivia_winner_patch,
};

/// Current state of the buzz-in window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzWindow {
    /// Buzzing disabled and no winner recorded.
    Locked,
    /// Buzzing enabled, waiting for the first attempt.
    Open,
    /// A team won the window; buzzing is closed until re-armed.
    Resolved {
        /// Winning team.
        team_id: Uuid,
    },
}

/// Operations applied to the buzz window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzEvent {
    /// Open a fresh window.
    Enable,
    /// Close the window and forget the winner.
    Disable,
    /// Re-arm for the next question.
    Reset {
        /// Whether the new window starts open.
        open: bool,
    },
    /// A team tries to buzz in.
    Attempt {
        /// Team requesting the buzz.
        team_id: Uuid,
    },
}

/// Returned when a buzz attempt arrives while the window is not open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot buzz right now")]
pub struct CannotBuzz {
    /// Window state observed by the rejected attempt.
    pub window: BuzzWindow,
}

/// Buzz request as received from a player device.
#[derive(Debug, Clone, Default)]
pub struct BuzzAttempt {
    /// Team claiming the window.
    pub team_id: Uuid,
    /// Player pressing the buzzer, when known.
    pub player_id: Option<Uuid>,
    /// Display name sent with the request; resolved from the player otherwise.
    pub player_name: Option<String>,
    /// Question shown when the buzz happened.
    pub question_text: Option<String>,
}

/// Records produced by an accepted buzz, to be committed together.
#[derive(Debug, Clone)]
pub struct BuzzOutcome {
    /// Resolved state naming the winner.
    pub state: GameStateEntity,
    /// Log entry of the winning buzz.
    pub buzz: BuzzEntity,
}

impl BuzzWindow {
    /// Derive the window from a stored game state.
    pub fn of(state: &GameStateEntity) -> Self {
        match (state.can_buzz, state.buzzed_team_id) {
            (true, _) => BuzzWindow::Open,
            (false, Some(team_id)) => BuzzWindow::Resolved { team_id },
            (false, None) => BuzzWindow::Locked,
        }
    }

    /// Compute the window reached by applying `event`.
    ///
    /// Only [`BuzzEvent::Attempt`] can fail; every other event is valid from
    /// any state and always clears the winner.
    pub fn next(self, event: BuzzEvent) -> Result<BuzzWindow, CannotBuzz> {
        match (self, event) {
            (_, BuzzEvent::Enable) => Ok(BuzzWindow::Open),
            (_, BuzzEvent::Disable) => Ok(BuzzWindow::Locked),
            (_, BuzzEvent::Reset { open: true }) => Ok(BuzzWindow::Open),
            (_, BuzzEvent::Reset { open: false }) => Ok(BuzzWindow::Locked),
            (BuzzWindow::Open, BuzzEvent::Attempt { team_id }) => {
                Ok(BuzzWindow::Resolved { team_id })
            }
            (window, BuzzEvent::Attempt { .. }) => Err(CannotBuzz { window }),
        }
    }

    /// Whether buzzing is currently accepted.
    pub fn can_buzz(&self) -> bool {
        matches!(self, BuzzWindow::Open)
    }

    /// Winner of the window, if any.
    pub fn winner(&self) -> Option<Uuid> {
        match self {
            BuzzWindow::Resolved { team_id } => Some(*team_id),
            _ => None,
        }
    }

    /// Write the window back onto a game state record.
    pub fn write_to(&self, state: &mut GameStateEntity) {
        state.can_buzz = self.can_buzz();
        state.buzzed_team_id = self.winner();
    }
}

/// Apply a non-attempt event to a game state, returning the updated record.
pub fn apply_window_event(
    current: &GameStateEntity,
    event: BuzzEvent,
    now: SystemTime,
) -> Result<GameStateEntity, CannotBuzz> {
    let next = BuzzWindow::of(current).next(event)?;
    let mut state = current.clone();
    next.write_to(&mut state);
    state.updated_at = now;
    Ok(state)
}

/// Arbitrate a buzz attempt against the current game state.
///
/// On success the returned state holds the winner and the trivia block names
/// the winning player. `player` is the record looked up for the attempt's
/// player id, used when the attempt does not carry a display name.
pub fn resolve_buzz(
    current: &GameStateEntity,
    attempt: &BuzzAttempt,
    player: Option<&PlayerEntity>,
    now: SystemTime,
) -> Result<BuzzOutcome, CannotBuzz> {
    let next = BuzzWindow::of(current).next(BuzzEvent::Attempt {
        team_id: attempt.team_id,
    })?;

    let player_name = attempt
        .player_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .or_else(|| player.map(|p| p.name.clone()));

    let mut state = current.clone();
    next.write_to(&mut state);
    state.updated_at = now;
    let patch = trivia_winner_patch(attempt.player_id.map(|id| id.to_string()), player_name);
    state.round_data = Some(
        state
            .round_data
            .take()
            .unwrap_or_default()
            .merged(&patch),
    );

    let buzz = BuzzEntity {
        id: Uuid::new_v4(),
        game_id: current.game_id,
        team_id: attempt.team_id,
        player_id: attempt.player_id,
        question_text: attempt
            .question_text
            .clone()
            .or_else(|| current.current_question.clone()),
        was_first: true,
        created_at: now,
    };

    Ok(BuzzOutcome { state, buzz })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::round_data::RoundData;

    fn state(can_buzz: bool, buzzed: Option<Uuid>) -> GameStateEntity {
        let mut state = GameStateEntity::initial(Uuid::new_v4(), RoundData::default(), SystemTime::now());
        state.can_buzz = can_buzz;
        state.buzzed_team_id = buzzed;
        state
    }

    #[test]
    fn window_is_derived_from_state_fields() {
        let team = Uuid::new_v4();
        assert_eq!(BuzzWindow::of(&state(false, None)), BuzzWindow::Locked);
        assert_eq!(BuzzWindow::of(&state(true, None)), BuzzWindow::Open);
        assert_eq!(
            BuzzWindow::of(&state(false, Some(team))),
            BuzzWindow::Resolved { team_id: team }
        );
    }

    #[test]
    fn first_attempt_wins_and_second_is_rejected() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let resolved = BuzzWindow::Open.next(BuzzEvent::Attempt { team_id: a }).unwrap();
        assert_eq!(resolved, BuzzWindow::Resolved { team_id: a });

        let err = resolved.next(BuzzEvent::Attempt { team_id: b }).unwrap_err();
        assert_eq!(err.window, BuzzWindow::Resolved { team_id: a });
        assert_eq!(err.to_string(), "cannot buzz right now");
    }

    #[test]
    fn attempt_while_locked_fails() {
        let err = BuzzWindow::Locked
            .next(BuzzEvent::Attempt { team_id: Uuid::new_v4() })
            .unwrap_err();
        assert_eq!(err.window, BuzzWindow::Locked);
    }

    #[test]
    fn control_events_always_clear_winner() {
        let resolved = BuzzWindow::Resolved { team_id: Uuid::new_v4() };

        assert_eq!(resolved.next(BuzzEvent::Enable), Ok(BuzzWindow::Open));
        assert_eq!(resolved.next(BuzzEvent::Disable), Ok(BuzzWindow::Locked));
        assert_eq!(resolved.next(BuzzEvent::Reset { open: true }), Ok(BuzzWindow::Open));
        assert_eq!(resolved.next(BuzzEvent::Reset { open: false }), Ok(BuzzWindow::Locked));
        assert_eq!(BuzzWindow::Locked.next(BuzzEvent::Enable), Ok(BuzzWindow::Open));
    }

    #[test]
    fn winner_is_set_only_while_closed() {
        let team = Uuid::new_v4();
        for window in [
            BuzzWindow::Locked,
            BuzzWindow::Open,
            BuzzWindow::Resolved { team_id: team },
        ] {
            let mut record = state(false, None);
            window.write_to(&mut record);
            if record.buzzed_team_id.is_some() {
                assert!(!record.can_buzz);
            }
        }
    }

    #[test]
    fn resolve_records_winner_and_event() {
        let team = Uuid::new_v4();
        let player_id = Uuid::new_v4();
        let mut current = state(true, None);
        current.current_question = Some("Capital of France?".into());
        let player = PlayerEntity {
            id: player_id,
            game_id: current.game_id,
            team_id: team,
            name: "Alice".into(),
            connected: true,
            last_seen: SystemTime::now(),
            created_at: SystemTime::now(),
        };
        let attempt = BuzzAttempt {
            team_id: team,
            player_id: Some(player_id),
            ..Default::default()
        };

        let outcome = resolve_buzz(&current, &attempt, Some(&player), SystemTime::now()).unwrap();

        assert!(!outcome.state.can_buzz);
        assert_eq!(outcome.state.buzzed_team_id, Some(team));
        assert_eq!(outcome.buzz.team_id, team);
        assert!(outcome.buzz.was_first);
        assert_eq!(outcome.buzz.question_text.as_deref(), Some("Capital of France?"));
        let trivia = outcome.state.round_data.unwrap().trivia().unwrap();
        assert_eq!(trivia.buzzed_player_id, Some(player_id.to_string()));
        assert_eq!(trivia.buzzed_player_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn unknown_player_leaves_name_empty() {
        let current = state(true, None);
        let attempt = BuzzAttempt {
            team_id: Uuid::new_v4(),
            player_id: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let outcome = resolve_buzz(&current, &attempt, None, SystemTime::now()).unwrap();

        let trivia = outcome.state.round_data.unwrap().trivia().unwrap();
        assert!(trivia.buzzed_player_id.is_some());
        assert_eq!(trivia.buzzed_player_name, None);
    }

    #[test]
    fn rejected_attempt_changes_nothing() {
        let winner = Uuid::new_v4();
        let current = state(false, Some(winner));
        let attempt = BuzzAttempt {
            team_id: Uuid::new_v4(),
            ..Default::default()
        };

        assert!(resolve_buzz(&current, &attempt, None, SystemTime::now()).is_err());
        assert_eq!(current.buzzed_team_id, Some(winner));
    }
}
