//! Core deterministic primitives.
//!
//! Seeded randomness and state hashing. Nothing in here reads the clock
//! or the OS, apart from `rng::entropy_seed` for unseeded sessions.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::{DeterministicRng, derive_round_seed};
pub use hash::{StateHash, StateHasher, compute_state_hash};
