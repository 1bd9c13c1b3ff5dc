//! Round Replay
//!
//! Rounds are reproducible from `(seed, configuration, inputs)`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    REPLAY                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  transcript.rs   - Round transcript recording + encoding    │
//! │  verify.rs       - Verification by replay                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod transcript;
pub mod verify;

// Re-export key types
pub use transcript::{
    RoundTranscript, RoundMetadata, RoundResult, TranscriptError, TRANSCRIPT_VERSION,
};
pub use verify::{replay_round, verify_transcript, ReplayError, VerificationResult};
