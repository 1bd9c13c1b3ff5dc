//! # Reaction Grid
//!
//! Game engine for a reaction-speed minigame: squares on a grid light up
//! one at a time at random, and the player must click the lit square before
//! its deadline. Successes and fails accrue until either reaches the target.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    REACTION GRID                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Round rules (deterministic)               │
//! │  ├── state.rs    - Squares, board, scoreboard                │
//! │  ├── input.rs    - Inputs that advance a round               │
//! │  ├── engine.rs   - Turn protocol state machine               │
//! │  ├── events.rs   - Events for observers                      │
//! │  └── snapshot.rs - Read-only projection for rendering        │
//! │                                                              │
//! │  replay/         - Transcripts and replay verification       │
//! │                                                              │
//! │  runtime/        - Async shell (non-deterministic)           │
//! │  ├── session.rs  - Task owning the engine + turn deadline    │
//! │  └── protocol.rs - Command messages                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `game/` and `replay/` modules never read the clock:
//! - The turn deadline is a `TurnTimer` request; the runtime arms it
//! - Expiry comes back as `GameEngine::expire(generation)`
//! - All square selection uses a seeded Xorshift128+
//!
//! Given the same round seed and inputs, a round ends in the same state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod replay;
pub mod runtime;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::engine::{EngineConfig, GameEngine, GameError, SelectOutcome};
pub use game::state::{RoundPhase, RoundSummary, Square, SquareId, SquareState};
pub use game::events::{GameEvent, GameEventData};
pub use runtime::session::{GameHandle, GameSession, SessionConfig, SessionError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Squares on a freshly created board
pub const DEFAULT_SQUARE_QUANTITY: u32 = 25;

/// Per-turn deadline (ms)
pub const DEFAULT_TIMER_MS: u64 = 1000;

/// Either counter reaching this ends the round
pub const DEFAULT_MAX_SCORE: u32 = 10;

/// Both counters reset to this at round start
pub const START_SCORE: u32 = 0;
