//! Game Events
//!
//! Events generated by the engine for observers and for the runtime's
//! broadcast channel. `RoundFinished` is the one-shot finished notification.

use serde::{Serialize, Deserialize};
use crate::game::state::{RoundId, RoundSummary, SquareId, SquareState};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Board rebuilt with a new square count
    BoardConfigured {
        quantity: u32,
    },

    /// Finish threshold changed
    MaxScoreChanged {
        max_score: u32,
    },

    /// New round began (fresh board, reset scores)
    RoundStarted {
        round_id: RoundId,
        quantity: u32,
        timer_ms: u64,
        max_score: u32,
    },

    /// A square lit up and its deadline was armed
    SquareActivated {
        square: SquareId,
    },

    /// A lit square was resolved
    SquareResolved {
        square: SquareId,
        state: SquareState,
    },

    /// Counters changed
    ScoreChanged {
        success_count: u32,
        fail_count: u32,
    },

    /// Round finished; fired exactly once per round
    RoundFinished {
        summary: RoundSummary,
    },
}

/// A game event tagged with the turn it happened on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Turn number (0 before the first square lights up)
    pub turn: u32,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(turn: u32, data: GameEventData) -> Self {
        Self { turn, data }
    }

    /// Create board configured event.
    pub fn board_configured(turn: u32, quantity: u32) -> Self {
        Self::new(turn, GameEventData::BoardConfigured { quantity })
    }

    /// Create max score changed event.
    pub fn max_score_changed(turn: u32, max_score: u32) -> Self {
        Self::new(turn, GameEventData::MaxScoreChanged { max_score })
    }

    /// Create round started event.
    pub fn round_started(round_id: RoundId, quantity: u32, timer_ms: u64, max_score: u32) -> Self {
        Self::new(
            0,
            GameEventData::RoundStarted {
                round_id,
                quantity,
                timer_ms,
                max_score,
            },
        )
    }

    /// Create square activated event.
    pub fn square_activated(turn: u32, square: SquareId) -> Self {
        Self::new(turn, GameEventData::SquareActivated { square })
    }

    /// Create square resolved event.
    pub fn square_resolved(turn: u32, square: SquareId, state: SquareState) -> Self {
        Self::new(turn, GameEventData::SquareResolved { square, state })
    }

    /// Create score changed event.
    pub fn score_changed(turn: u32, success_count: u32, fail_count: u32) -> Self {
        Self::new(
            turn,
            GameEventData::ScoreChanged {
                success_count,
                fail_count,
            },
        )
    }

    /// Create round finished event.
    pub fn round_finished(turn: u32, summary: RoundSummary) -> Self {
        Self::new(turn, GameEventData::RoundFinished { summary })
    }

    /// The finished summary, if this is the finished notification.
    pub fn finished_summary(&self) -> Option<&RoundSummary> {
        match &self.data {
            GameEventData::RoundFinished { summary } => Some(summary),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::FinishReason;

    #[test]
    fn test_finished_summary() {
        let summary = RoundSummary {
            round_id: RoundId::new([1; 16]),
            success_count: 3,
            fail_count: 1,
            reason: FinishReason::SuccessTarget,
            turns: 4,
        };

        let event = GameEvent::round_finished(4, summary);
        assert_eq!(event.finished_summary(), Some(&summary));

        let other = GameEvent::square_activated(1, 2);
        assert!(other.finished_summary().is_none());
    }

    #[test]
    fn test_event_json_shape() {
        let event = GameEvent::square_resolved(2, 4, SquareState::Fail);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["turn"], 2);
        assert_eq!(json["data"]["SquareResolved"]["square"], 4);
        assert_eq!(json["data"]["SquareResolved"]["state"], "Fail");
    }
}
