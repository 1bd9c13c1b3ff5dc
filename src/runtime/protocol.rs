//! Session Protocol
//!
//! Messages sent from `GameHandle`s to the session task. Every request
//! carries a oneshot reply channel; the task answers after the engine has
//! applied the command and the turn deadline has been re-synced.

use tokio::sync::oneshot;

use crate::game::engine::{GameError, SelectOutcome};
use crate::game::snapshot::RoundSnapshot;
use crate::game::state::{RoundId, SquareId};
use crate::replay::transcript::RoundTranscript;

/// Reply channel for a command.
pub type Reply<T> = oneshot::Sender<T>;

/// Commands understood by the session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Rebuild the board.
    Configure {
        /// New square count.
        quantity: u32,
        /// Result channel.
        reply: Reply<Result<(), GameError>>,
    },

    /// Start (or restart) a round.
    Start {
        /// Per-turn deadline.
        timer_ms: u64,
        /// Result channel.
        reply: Reply<Result<RoundId, GameError>>,
    },

    /// Player clicked a square.
    Select {
        /// Clicked square.
        square: SquareId,
        /// Result channel.
        reply: Reply<Result<SelectOutcome, GameError>>,
    },

    /// Change the finish threshold.
    SetMaxScore {
        /// New threshold.
        max_score: u32,
        /// Result channel.
        reply: Reply<Result<(), GameError>>,
    },

    /// Read-only projection of the round.
    Snapshot {
        /// Result channel.
        reply: Reply<RoundSnapshot>,
    },

    /// Transcript of the current or last round.
    Transcript {
        /// Result channel.
        reply: Reply<RoundTranscript>,
    },

    /// Stop the task; pending deadline is dropped.
    Shutdown,
}

impl SessionCommand {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Configure { .. } => "configure",
            SessionCommand::Start { .. } => "start",
            SessionCommand::Select { .. } => "select",
            SessionCommand::SetMaxScore { .. } => "set_max_score",
            SessionCommand::Snapshot { .. } => "snapshot",
            SessionCommand::Transcript { .. } => "transcript",
            SessionCommand::Shutdown => "shutdown",
        }
    }
}
