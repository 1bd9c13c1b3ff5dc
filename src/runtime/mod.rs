//! Runtime Module
//!
//! The non-deterministic shell around the engine: a tokio task that owns
//! the round, arms real turn deadlines, and broadcasts events.
//!
//! - `session`: Session task, `GameHandle` client, configuration
//! - `protocol`: Commands sent to the session task

pub mod protocol;
pub mod session;

pub use protocol::SessionCommand;
pub use session::{GameHandle, GameSession, SessionConfig, SessionError, next_finished};
