//! Round Transcript Recording
//!
//! Records everything needed to deterministically reproduce a round:
//! the round seed, the configuration it started with, and the ordered
//! inputs that advanced it.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::hash::StateHash;
use crate::game::engine::GameEngine;
use crate::game::input::{TurnInput, hash_inputs};
use crate::game::state::{RoundId, RoundSummary};

/// Current transcript version.
pub const TRANSCRIPT_VERSION: u8 = 1;

/// Complete round transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundTranscript {
    /// Version for forward compatibility.
    pub version: u8,

    /// Round parameters fixed at `start`.
    pub metadata: RoundMetadata,

    /// Inputs that changed state, in order.
    pub inputs: Vec<TurnInput>,

    /// Final result, once the round finished.
    pub result: Option<RoundResult>,
}

/// Round parameters fixed at `start`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundMetadata {
    /// Round identifier.
    pub round_id: RoundId,

    /// Seed the round's RNG was created from.
    pub rng_seed: u64,

    /// Board size.
    pub quantity: u32,

    /// Per-turn deadline.
    pub timer_ms: u64,

    /// Threshold when the round started.
    pub max_score: u32,

    /// Counter reset value.
    pub start_score: u32,

    /// Wall-clock start time (informational, not replayed).
    pub started_at: DateTime<Utc>,
}

/// Final round result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Finished notification payload.
    pub summary: RoundSummary,

    /// Engine state hash after the last input.
    pub final_hash: StateHash,

    /// Hash of the input sequence.
    pub inputs_hash: StateHash,
}

/// Errors that can occur with transcripts.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Deserialization failed.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Version mismatch.
    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Supported version.
        expected: u8,
        /// Version found in the data.
        got: u8,
    },
}

impl RoundTranscript {
    /// Record the engine's current (or last) round.
    ///
    /// The result is filled in only if the round has finished.
    pub fn capture(engine: &GameEngine, started_at: DateTime<Utc>) -> Self {
        let inputs = engine.inputs().to_vec();
        let result = engine
            .summary()
            .zip(engine.final_hash())
            .map(|(summary, final_hash)| RoundResult {
                summary,
                final_hash,
                inputs_hash: hash_inputs(&inputs),
            });

        Self {
            version: TRANSCRIPT_VERSION,
            metadata: RoundMetadata {
                round_id: engine.round_id(),
                rng_seed: engine.round_seed(),
                quantity: engine.round_quantity(),
                timer_ms: engine.timer_ms(),
                max_score: engine.round_max_score(),
                start_score: engine.start_score(),
                started_at,
            },
            inputs,
            result,
        }
    }

    /// Check if transcript is complete.
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TranscriptError> {
        bincode::serialize(self).map_err(|e| TranscriptError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TranscriptError> {
        let transcript: Self = bincode::deserialize(data)
            .map_err(|e| TranscriptError::DeserializationFailed(e.to_string()))?;
        transcript.check_version()?;
        Ok(transcript)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, TranscriptError> {
        serde_json::to_string(self).map_err(|e| TranscriptError::SerializationFailed(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, TranscriptError> {
        let transcript: Self = serde_json::from_str(s)
            .map_err(|e| TranscriptError::DeserializationFailed(e.to_string()))?;
        transcript.check_version()?;
        Ok(transcript)
    }

    fn check_version(&self) -> Result<(), TranscriptError> {
        if self.version != TRANSCRIPT_VERSION {
            return Err(TranscriptError::VersionMismatch {
                expected: TRANSCRIPT_VERSION,
                got: self.version,
            });
        }
        Ok(())
    }
}
