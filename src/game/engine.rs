//! Round Engine
//!
//! The authoritative state machine for one player's board. 100% deterministic:
//! the turn deadline is a request (`TurnTimer`) that the runtime arms, and
//! deadline expiry comes back in as an explicit `expire(generation)` call.
//!
//! ## Turn Protocol
//!
//! 1. Cancel the armed turn timer
//! 2. If a counter reached the threshold, finish the round (once)
//! 3. Otherwise light a random `Default` square
//! 4. Arm a new turn timer; on expiry the square fails and we loop
//! 5. No `Default` square left: finish with `BoardExhausted`

use std::time::Duration;
use thiserror::Error;

use crate::core::hash::{StateHash, compute_state_hash};
use crate::core::rng::{DeterministicRng, derive_round_seed, entropy_seed};
use crate::game::events::GameEvent;
use crate::game::input::TurnInput;
use crate::game::snapshot::RoundSnapshot;
use crate::game::state::{
    Board, FinishReason, RoundId, RoundPhase, RoundSummary, Scoreboard, Square, SquareId,
    SquareState,
};

// =============================================================================
// CONFIG & ERRORS
// =============================================================================

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Squares on the board
    pub square_quantity: u32,
    /// Per-turn deadline in milliseconds
    pub timer_ms: u64,
    /// Finish threshold for either counter
    pub max_score: u32,
    /// Value both counters reset to at round start
    pub start_score: u32,
    /// Session seed; `None` draws one from OS entropy
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            square_quantity: crate::DEFAULT_SQUARE_QUANTITY,
            timer_ms: crate::DEFAULT_TIMER_MS,
            max_score: crate::DEFAULT_MAX_SCORE,
            start_score: crate::START_SCORE,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Reject zero quantity, timer or threshold, and a start score that
    /// would finish a round before its first turn.
    pub fn validate(&self) -> Result<(), GameError> {
        positive("square_quantity", self.square_quantity as u64)?;
        positive("timer_ms", self.timer_ms)?;
        positive("max_score", self.max_score as u64)?;
        if self.start_score >= self.max_score {
            return Err(GameError::InvalidConfiguration {
                field: "start_score",
                value: self.start_score as u64,
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: u64) -> Result<(), GameError> {
    if value == 0 {
        return Err(GameError::InvalidConfiguration { field, value });
    }
    Ok(())
}

/// Engine errors. None of them leave the round partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Zero quantity, timer or threshold, or a threshold not above the
    /// start score.
    #[error("invalid configuration: {field} out of range, got {value}")]
    InvalidConfiguration {
        /// Offending field
        field: &'static str,
        /// Rejected value
        value: u64,
    },

    /// `select` referenced a square that isn't on the board.
    #[error("unknown square {id} (board has {board_size} squares)")]
    UnknownSquareId {
        /// Requested id
        id: SquareId,
        /// Current board size
        board_size: u32,
    },

    /// No `Default` square left to light. Handled internally as a finish.
    #[error("no eligible square left to light")]
    NoEligibleSquare,
}

// =============================================================================
// TIMER & OUTCOMES
// =============================================================================

/// A turn deadline the runtime must arm.
///
/// Each arm gets a fresh generation; an expiry carrying any other
/// generation is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTimer {
    /// Arm counter
    pub generation: u64,
    /// Time until the current square fails
    pub duration: Duration,
}

/// Result of `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Clicked the lit square in time
    Hit,
    /// Clicked a `Current` square that wasn't the active one (defensive)
    Miss,
    /// Square wasn't lit, or no round is running
    Ignored,
    /// Round already finished; timer cancelled, nothing scored
    RoundOver,
}

/// Result of `expire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireOutcome {
    /// Deadline hit: the square failed
    Missed {
        /// The square that timed out
        square: SquareId,
    },
    /// Generation no longer armed
    Stale,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Owns the round: board, scoreboard, turn timer and active square.
#[derive(Debug, Clone)]
pub struct GameEngine {
    quantity: u32,
    timer_ms: u64,
    board: Board,
    score: Scoreboard,
    phase: RoundPhase,
    active: Option<SquareId>,
    timer: Option<TurnTimer>,
    next_generation: u64,
    turn: u32,
    round_id: RoundId,
    session_seed: u64,
    round_index: u64,
    round_seed: u64,
    round_max_score: u32,
    round_quantity: u32,
    rng: DeterministicRng,
    summary: Option<RoundSummary>,
    final_hash: Option<StateHash>,
    inputs: Vec<TurnInput>,
    pending_events: Vec<GameEvent>,
}

impl GameEngine {
    /// Create an idle engine. The board is built lazily by `configure`
    /// or the first `start`.
    pub fn new(config: EngineConfig) -> Result<Self, GameError> {
        config.validate()?;
        let session_seed = config.seed.unwrap_or_else(entropy_seed);

        Ok(Self {
            quantity: config.square_quantity,
            timer_ms: config.timer_ms,
            board: Board::default(),
            score: Scoreboard::new(config.max_score, config.start_score),
            phase: RoundPhase::Idle,
            active: None,
            timer: None,
            next_generation: 0,
            turn: 0,
            round_id: RoundId::default(),
            session_seed,
            round_index: 0,
            round_seed: 0,
            round_max_score: config.max_score,
            round_quantity: config.square_quantity,
            rng: DeterministicRng::new(session_seed),
            summary: None,
            final_hash: None,
            inputs: Vec::new(),
            pending_events: Vec::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Rebuild the board with `quantity` unlit squares.
    ///
    /// A running round is dropped back to `Idle` first.
    pub fn configure(&mut self, quantity: u32) -> Result<(), GameError> {
        positive("square_quantity", quantity as u64)?;

        self.abandon_round();
        self.quantity = quantity;
        self.board = Board::new(quantity);
        self.pending_events
            .push(GameEvent::board_configured(self.turn, quantity));
        Ok(())
    }

    /// Start a fresh round with a `timer_ms` deadline per turn.
    ///
    /// Restarting an active round discards it entirely.
    pub fn start(&mut self, timer_ms: u64) -> Result<RoundId, GameError> {
        positive("timer_ms", timer_ms)?;

        let seed = derive_round_seed(self.session_seed, self.round_index);
        self.round_index += 1;
        let round_id = RoundId::generate();
        self.begin_round(round_id, timer_ms, seed);
        Ok(round_id)
    }

    /// Player clicked square `id`.
    pub fn select(&mut self, id: SquareId) -> Result<SelectOutcome, GameError> {
        let state = self.board.state_of(id).ok_or(GameError::UnknownSquareId {
            id,
            board_size: self.board.len() as u32,
        })?;

        match self.phase {
            RoundPhase::Finished => {
                self.cancel_timer();
                return Ok(SelectOutcome::RoundOver);
            }
            RoundPhase::Idle => return Ok(SelectOutcome::Ignored),
            RoundPhase::Active => {}
        }

        if state != SquareState::Current {
            return Ok(SelectOutcome::Ignored);
        }

        self.inputs.push(TurnInput::Select { square: id });

        if self.active != Some(id) {
            // Only one square is ever Current, so this is unreachable in
            // practice. Fail the stray square and leave the live turn alone.
            self.board.resolve(id, SquareState::Fail);
            self.pending_events
                .push(GameEvent::square_resolved(self.turn, id, SquareState::Fail));
            return Ok(SelectOutcome::Miss);
        }

        self.active = None;
        self.board.resolve(id, SquareState::Success);
        self.score.add_success();
        self.pending_events
            .push(GameEvent::square_resolved(self.turn, id, SquareState::Success));
        self.push_score_event();

        self.next_turn();
        Ok(SelectOutcome::Hit)
    }

    /// The deadline armed as `generation` elapsed.
    pub fn expire(&mut self, generation: u64) -> ExpireOutcome {
        let armed = matches!(self.timer, Some(t) if t.generation == generation);
        if !armed || self.phase != RoundPhase::Active {
            return ExpireOutcome::Stale;
        }

        let Some(id) = self.active.take() else {
            self.cancel_timer();
            return ExpireOutcome::Stale;
        };

        self.inputs.push(TurnInput::Expire);
        self.board.resolve(id, SquareState::Fail);
        self.score.add_fail();
        self.pending_events
            .push(GameEvent::square_resolved(self.turn, id, SquareState::Fail));
        self.push_score_event();

        self.next_turn();
        ExpireOutcome::Missed { square: id }
    }

    /// Change the finish threshold.
    ///
    /// Takes effect the next time the turn protocol runs; the board and
    /// round are untouched.
    pub fn set_max_score(&mut self, max_score: u32) -> Result<(), GameError> {
        positive("max_score", max_score as u64)?;
        // Counters reset to start_score; the next round must not open finished
        if max_score <= self.score.start_score {
            return Err(GameError::InvalidConfiguration {
                field: "max_score",
                value: max_score as u64,
            });
        }

        self.score.max_score = max_score;
        if self.phase == RoundPhase::Active {
            self.inputs.push(TurnInput::SetMaxScore { max_score });
        }
        self.pending_events
            .push(GameEvent::max_score_changed(self.turn, max_score));
        Ok(())
    }

    /// Drain events generated since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The board, in id order.
    pub fn squares(&self) -> &[Square] {
        self.board.squares()
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The lit square, if any.
    pub fn active_square(&self) -> Option<SquareId> {
        self.active
    }

    /// Squares clicked in time this round.
    pub fn success_count(&self) -> u32 {
        self.score.success_count
    }

    /// Squares that timed out this round.
    pub fn fail_count(&self) -> u32 {
        self.score.fail_count
    }

    /// True once the round has finished; stays true until the next `start`.
    pub fn is_finished(&self) -> bool {
        self.phase == RoundPhase::Finished
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Current finish threshold.
    pub fn max_score(&self) -> u32 {
        self.score.max_score
    }

    /// Counter reset value.
    pub fn start_score(&self) -> u32 {
        self.score.start_score
    }

    /// Configured square count (survives restarts).
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Deadline used by the current or last round.
    pub fn timer_ms(&self) -> u64 {
        self.timer_ms
    }

    /// Number of squares lit so far this round.
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Id of the current or last round.
    pub fn round_id(&self) -> RoundId {
        self.round_id
    }

    /// Seed of the current or last round.
    pub fn round_seed(&self) -> u64 {
        self.round_seed
    }

    /// Threshold in force when the current or last round started.
    pub fn round_max_score(&self) -> u32 {
        self.round_max_score
    }

    /// Board size of the current or last round (a later `configure`
    /// doesn't change it).
    pub fn round_quantity(&self) -> u32 {
        self.round_quantity
    }

    /// The deadline the runtime should have armed, if any.
    pub fn turn_timer(&self) -> Option<TurnTimer> {
        self.timer
    }

    /// Final result, once finished.
    pub fn summary(&self) -> Option<RoundSummary> {
        self.summary
    }

    /// State hash taken when the round finished.
    ///
    /// Later threshold changes don't alter it.
    pub fn final_hash(&self) -> Option<StateHash> {
        self.final_hash
    }

    /// Inputs that advanced the current round, in order.
    pub fn inputs(&self) -> &[TurnInput] {
        &self.inputs
    }

    /// Read-only projection for rendering.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot::capture(self)
    }

    /// Deterministic hash of the round state.
    pub fn state_hash(&self) -> StateHash {
        compute_state_hash(self.turn, self.round_seed, |hasher| {
            self.board.hash_into(hasher);
            hasher.update_u32(self.score.success_count);
            hasher.update_u32(self.score.fail_count);
            hasher.update_u32(self.score.max_score);
            hasher.update_opt_u32(self.active);
            hasher.update_u8(self.phase as u8);
        })
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Reset everything round-scoped and run the first turn.
    pub(crate) fn begin_round(&mut self, round_id: RoundId, timer_ms: u64, seed: u64) {
        self.cancel_timer();

        if self.board.is_empty() {
            self.board = Board::new(self.quantity);
            self.pending_events
                .push(GameEvent::board_configured(0, self.quantity));
        }

        self.timer_ms = timer_ms;
        self.board.reset();
        self.score.reset();
        self.active = None;
        self.turn = 0;
        self.summary = None;
        self.final_hash = None;
        self.inputs.clear();
        self.round_id = round_id;
        self.round_seed = seed;
        self.round_max_score = self.score.max_score;
        self.round_quantity = self.board.len() as u32;
        self.rng = DeterministicRng::new(seed);
        self.phase = RoundPhase::Active;

        self.pending_events.push(GameEvent::round_started(
            round_id,
            self.board.len() as u32,
            timer_ms,
            self.score.max_score,
        ));
        self.push_score_event();

        self.next_turn();
    }

    /// Turn protocol.
    fn next_turn(&mut self) {
        self.cancel_timer();

        if let Some(reason) = self.score.reached() {
            self.finish(reason);
            return;
        }

        match self.light_next() {
            Ok(id) => {
                self.turn += 1;
                self.active = Some(id);
                self.arm_timer();
                self.pending_events
                    .push(GameEvent::square_activated(self.turn, id));
            }
            // Threshold above board size: every square resolved first
            Err(_) => self.finish(FinishReason::BoardExhausted),
        }
    }

    fn light_next(&mut self) -> Result<SquareId, GameError> {
        self.board
            .light_random(&mut self.rng)
            .ok_or(GameError::NoEligibleSquare)
    }

    /// Edge-triggered: only the first call per round does anything.
    fn finish(&mut self, reason: FinishReason) {
        if self.phase != RoundPhase::Active {
            return;
        }

        self.cancel_timer();
        self.active = None;
        self.phase = RoundPhase::Finished;

        let summary = RoundSummary {
            round_id: self.round_id,
            success_count: self.score.success_count,
            fail_count: self.score.fail_count,
            reason,
            turns: self.turn,
        };
        self.summary = Some(summary);
        self.final_hash = Some(self.state_hash());
        self.pending_events
            .push(GameEvent::round_finished(self.turn, summary));
    }

    /// Drop any round in progress without a finished notification.
    fn abandon_round(&mut self) {
        self.cancel_timer();
        self.active = None;
        self.phase = RoundPhase::Idle;
        self.turn = 0;
        self.summary = None;
        self.final_hash = None;
        self.inputs.clear();
    }

    fn arm_timer(&mut self) {
        self.next_generation += 1;
        self.timer = Some(TurnTimer {
            generation: self.next_generation,
            duration: Duration::from_millis(self.timer_ms),
        });
    }

    fn cancel_timer(&mut self) {
        self.timer = None;
    }

    fn push_score_event(&mut self) {
        self.pending_events.push(GameEvent::score_changed(
            self.turn,
            self.score.success_count,
            self.score.fail_count,
        ));
    }
}

// =============================================================================
// TESTS
// =============================================================================
