//! Game Logic Module
//!
//! All round rules. 100% deterministic: no clock, no OS randomness
//! (round ids aside), no logging. Observers get `GameEvent`s instead.
//!
//! ## Module Structure
//!
//! - `state`: Squares, board, scoreboard, round identity
//! - `input`: Inputs that advance a round
//! - `engine`: The round state machine and turn protocol
//! - `events`: Events for observers
//! - `snapshot`: Read-only projection for rendering

pub mod state;
pub mod input;
pub mod engine;
pub mod events;
pub mod snapshot;

// Re-export key types
pub use state::{
    Board, FinishReason, RoundId, RoundPhase, RoundSummary, Scoreboard, Square, SquareId,
    SquareState,
};
pub use input::TurnInput;
pub use engine::{EngineConfig, ExpireOutcome, GameEngine, GameError, SelectOutcome, TurnTimer};
pub use events::{GameEvent, GameEventData};
pub use snapshot::RoundSnapshot;
