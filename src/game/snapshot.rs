//! Read-only projection of the round for the presentation layer.

use serde::{Serialize, Deserialize};

use crate::game::engine::GameEngine;
use crate::game::state::{RoundId, RoundPhase, RoundSummary, Square, SquareId};

/// Everything a renderer needs to draw the board and the scores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// Current or last round
    pub round_id: RoundId,
    /// Lifecycle phase
    pub phase: RoundPhase,
    /// Squares lit so far
    pub turn: u32,
    /// Board, in id order
    pub squares: Vec<Square>,
    /// Lit square, if any
    pub active_square: Option<SquareId>,
    /// Successes this round
    pub success_count: u32,
    /// Fails this round
    pub fail_count: u32,
    /// Finish threshold
    pub max_score: u32,
    /// Per-turn deadline
    pub timer_ms: u64,
    /// Final result once finished
    pub summary: Option<RoundSummary>,
    /// Hex-encoded state hash; equal hashes mean nothing to redraw
    pub state_hash: String,
}

impl RoundSnapshot {
    /// Capture the engine's current state.
    pub fn capture(engine: &GameEngine) -> Self {
        Self {
            round_id: engine.round_id(),
            phase: engine.phase(),
            turn: engine.turn(),
            squares: engine.squares().to_vec(),
            active_square: engine.active_square(),
            success_count: engine.success_count(),
            fail_count: engine.fail_count(),
            max_score: engine.max_score(),
            timer_ms: engine.timer_ms(),
            summary: engine.summary(),
            state_hash: hex::encode(engine.state_hash()),
        }
    }

    /// True once the round is over.
    pub fn is_finished(&self) -> bool {
        self.phase == RoundPhase::Finished
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
