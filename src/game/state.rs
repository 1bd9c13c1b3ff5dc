//! Round State Definitions
//!
//! Squares, the board, the scoreboard and round identity.
//! Everything here is plain data plus the rules that keep it consistent.

use serde::{Serialize, Deserialize};

use crate::core::hash::StateHasher;
use crate::core::rng::DeterministicRng;

/// Square identifier: 0-indexed position on the board.
pub type SquareId = u32;

// =============================================================================
// ROUND ID
// =============================================================================

/// Unique round identifier (UUID as bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct RoundId(pub [u8; 16]);

impl RoundId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

// =============================================================================
// SQUARE
// =============================================================================

/// Resolution state of a square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum SquareState {
    /// Unlit, still eligible to become current
    #[default]
    Default = 0,
    /// Lit: the player must click it before the deadline
    Current = 1,
    /// Clicked in time
    Success = 2,
    /// Deadline missed
    Fail = 3,
}

impl SquareState {
    /// `Success` and `Fail` never change again within a round.
    #[inline]
    pub fn is_resolved(self) -> bool {
        matches!(self, SquareState::Success | SquareState::Fail)
    }
}

/// One cell of the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    /// Stable identity within a round
    pub id: SquareId,
    /// Current resolution state
    pub state: SquareState,
}

impl Square {
    /// Create an unlit square.
    pub fn new(id: SquareId) -> Self {
        Self { id, state: SquareState::Default }
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// Ordered collection of squares; size is fixed for the lifetime of a round.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Board {
    squares: Vec<Square>,
}

impl Board {
    /// Build a board of `quantity` unlit squares.
    pub fn new(quantity: u32) -> Self {
        Self {
            squares: (0..quantity).map(Square::new).collect(),
        }
    }

    /// Number of squares.
    #[inline]
    pub fn len(&self) -> usize {
        self.squares.len()
    }

    /// True if the board was never configured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    /// All squares, in id order.
    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    /// Look up a square.
    pub fn get(&self, id: SquareId) -> Option<&Square> {
        self.squares.get(id as usize)
    }

    /// State of a square, if it exists.
    pub fn state_of(&self, id: SquareId) -> Option<SquareState> {
        self.get(id).map(|s| s.state)
    }

    /// Put every square back to `Default`.
    pub fn reset(&mut self) {
        for square in &mut self.squares {
            square.state = SquareState::Default;
        }
    }

    /// Ids of squares still eligible to become current.
    pub fn eligible(&self) -> Vec<SquareId> {
        self.squares
            .iter()
            .filter(|s| s.state == SquareState::Default)
            .map(|s| s.id)
            .collect()
    }

    /// Pick a uniformly random `Default` square and mark it `Current`.
    ///
    /// Returns `None` when no square is eligible.
    pub fn light_random(&mut self, rng: &mut DeterministicRng) -> Option<SquareId> {
        let eligible = self.eligible();
        let id = *rng.choose(&eligible)?;
        self.squares[id as usize].state = SquareState::Current;
        Some(id)
    }

    /// Resolve a `Current` square to `Success` or `Fail`.
    ///
    /// Returns false (and changes nothing) if the square is missing or
    /// not `Current`: resolved squares are terminal.
    pub fn resolve(&mut self, id: SquareId, outcome: SquareState) -> bool {
        debug_assert!(outcome.is_resolved());
        match self.squares.get_mut(id as usize) {
            Some(square) if square.state == SquareState::Current => {
                square.state = outcome;
                true
            }
            _ => false,
        }
    }

    /// Number of squares in a given state.
    pub fn count(&self, state: SquareState) -> usize {
        self.squares.iter().filter(|s| s.state == state).count()
    }

    /// Add board contents to a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.squares.len() as u32);
        for square in &self.squares {
            hasher.update_u8(square.state as u8);
        }
    }
}

// =============================================================================
// SCOREBOARD
// =============================================================================

/// Success/fail counters and the finish threshold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scoreboard {
    /// Squares clicked in time
    pub success_count: u32,
    /// Squares that timed out
    pub fail_count: u32,
    /// Finish threshold
    pub max_score: u32,
    /// Value both counters reset to at round start
    pub start_score: u32,
}

impl Scoreboard {
    /// Create a scoreboard with both counters at `start_score`.
    pub fn new(max_score: u32, start_score: u32) -> Self {
        Self {
            success_count: start_score,
            fail_count: start_score,
            max_score,
            start_score,
        }
    }

    /// Reset both counters to the start value.
    pub fn reset(&mut self) {
        self.success_count = self.start_score;
        self.fail_count = self.start_score;
    }

    /// Record a success.
    pub fn add_success(&mut self) {
        self.success_count += 1;
    }

    /// Record a fail.
    pub fn add_fail(&mut self) {
        self.fail_count += 1;
    }

    /// Which counter (if any) has reached the threshold.
    ///
    /// Counters only grow by one, so `>=` agrees with equality in normal
    /// play and still finishes when the threshold is lowered mid-round.
    pub fn reached(&self) -> Option<FinishReason> {
        if self.success_count >= self.max_score {
            Some(FinishReason::SuccessTarget)
        } else if self.fail_count >= self.max_score {
            Some(FinishReason::FailTarget)
        } else {
            None
        }
    }
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MAX_SCORE, crate::START_SCORE)
    }
}

// =============================================================================
// ROUND LIFECYCLE
// =============================================================================

/// Round lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum RoundPhase {
    /// No round running
    #[default]
    Idle = 0,
    /// Squares are lighting up
    Active = 1,
    /// Threshold reached (or board exhausted); waiting for a restart
    Finished = 2,
}

/// Why a round finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Success count hit the threshold
    SuccessTarget,
    /// Fail count hit the threshold
    FailTarget,
    /// Every square resolved before either count reached the threshold
    BoardExhausted,
}

/// Final result of a round, carried by the finished notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Round this summary belongs to
    pub round_id: RoundId,
    /// Final success count
    pub success_count: u32,
    /// Final fail count
    pub fail_count: u32,
    /// What ended the round
    pub reason: FinishReason,
    /// Number of squares lit during the round
    pub turns: u32,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_new() {
        let board = Board::new(5);
        assert_eq!(board.len(), 5);
        assert!(board.squares().iter().enumerate().all(|(i, s)| {
            s.id == i as SquareId && s.state == SquareState::Default
        }));
    }

    #[test]
    fn test_light_random_only_picks_default() {
        let mut board = Board::new(3);
        let mut rng = DeterministicRng::new(7);

        let first = board.light_random(&mut rng).unwrap();
        assert!(board.resolve(first, SquareState::Success));
        let second = board.light_random(&mut rng).unwrap();
        assert_ne!(first, second);
        assert!(board.resolve(second, SquareState::Fail));
        let third = board.light_random(&mut rng).unwrap();
        assert_ne!(third, first);
        assert_ne!(third, second);
        assert!(board.resolve(third, SquareState::Success));

        // Nothing left
        assert_eq!(board.light_random(&mut rng), None);
    }

    #[test]
    fn test_resolve_is_terminal() {
        let mut board = Board::new(2);
        let mut rng = DeterministicRng::new(1);
        let id = board.light_random(&mut rng).unwrap();

        assert!(board.resolve(id, SquareState::Success));
        assert!(!board.resolve(id, SquareState::Fail));
        assert_eq!(board.state_of(id), Some(SquareState::Success));

        // Default squares can't be resolved directly
        let other = 1 - id;
        assert!(!board.resolve(other, SquareState::Fail));
        assert_eq!(board.state_of(other), Some(SquareState::Default));

        // Out of range
        assert!(!board.resolve(99, SquareState::Fail));
    }

    #[test]
    fn test_board_reset() {
        let mut board = Board::new(4);
        let mut rng = DeterministicRng::new(3);
        let id = board.light_random(&mut rng).unwrap();
        board.resolve(id, SquareState::Fail);

        board.reset();
        assert_eq!(board.count(SquareState::Default), 4);
    }

    #[test]
    fn test_scoreboard_reached() {
        let mut score = Scoreboard::new(2, 0);
        assert_eq!(score.reached(), None);

        score.add_fail();
        score.add_success();
        assert_eq!(score.reached(), None);

        score.add_success();
        assert_eq!(score.reached(), Some(FinishReason::SuccessTarget));

        score.reset();
        score.add_fail();
        score.add_fail();
        assert_eq!(score.reached(), Some(FinishReason::FailTarget));
    }

    #[test]
    fn test_scoreboard_start_value() {
        let mut score = Scoreboard::new(5, 2);
        score.add_success();
        score.reset();
        assert_eq!(score.success_count, 2);
        assert_eq!(score.fail_count, 2);
    }

    #[test]
    fn test_round_id_display() {
        let id = RoundId::new([0xab; 16]);
        assert_eq!(id.to_string(), "abababab-abab-abab-abab-abababababab");
    }
}
