//! Round State Hashing
//!
//! SHA-256 digests over the replay-relevant parts of a round. A renderer
//! can compare hashes to skip redraws, and replay verification compares
//! the recorded final hash with the replayed one.

use sha2::{Sha256, Digest};

/// 32-byte SHA-256 digest.
pub type StateHash = [u8; 32];

const STATE_DOMAIN: &[u8] = b"REACTION_GRID_STATE_V1";
const INPUTS_DOMAIN: &[u8] = b"REACTION_GRID_INPUTS_V1";

/// Domain-separated SHA-256 with fixed-width little-endian fields.
///
/// Callers must feed fields in a fixed order; there is no framing beyond
/// the field widths.
pub struct StateHasher {
    inner: Sha256,
}

impl StateHasher {
    fn with_domain(domain: &[u8]) -> Self {
        Self {
            inner: Sha256::new_with_prefix(domain),
        }
    }

    /// Hasher for board + scoreboard state.
    pub fn for_round_state() -> Self {
        Self::with_domain(STATE_DOMAIN)
    }

    /// Hasher for a recorded input sequence.
    pub fn for_inputs() -> Self {
        Self::with_domain(INPUTS_DOMAIN)
    }

    /// Feed one byte (enum discriminants).
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.inner.update([value]);
    }

    /// Feed a count or square id.
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.inner.update(value.to_le_bytes());
    }

    /// Feed a seed.
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.inner.update(value.to_le_bytes());
    }

    /// Feed an optional square id; `None` and `Some(0)` hash differently.
    #[inline]
    pub fn update_opt_u32(&mut self, value: Option<u32>) {
        match value {
            None => self.update_u8(0),
            Some(v) => {
                self.update_u8(1);
                self.update_u32(v);
            }
        }
    }

    /// Consume the hasher.
    pub fn finalize(self) -> StateHash {
        self.inner.finalize().into()
    }
}

/// Hash of a round at `turn`, used by `GameEngine::state_hash`.
///
/// Turn and seed go in first; `add_state` appends board and scores.
pub fn compute_state_hash<F>(turn: u32, round_seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_round_state();
    hasher.update_u32(turn);
    hasher.update_u64(round_seed);
    add_state(&mut hasher);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_hash(states: &[u8], active: Option<u32>) -> StateHash {
        compute_state_hash(3, 42, |h| {
            for s in states {
                h.update_u8(*s);
            }
            h.update_opt_u32(active);
        })
    }

    #[test]
    fn test_identical_boards_hash_equal() {
        assert_eq!(board_hash(&[0, 1, 2, 3], Some(1)), board_hash(&[0, 1, 2, 3], Some(1)));
    }

    #[test]
    fn test_square_order_matters() {
        assert_ne!(board_hash(&[2, 3], None), board_hash(&[3, 2], None));
    }

    #[test]
    fn test_no_active_square_differs_from_square_zero() {
        assert_ne!(board_hash(&[1], None), board_hash(&[1], Some(0)));
    }

    #[test]
    fn test_turn_and_seed_are_hashed() {
        let base = compute_state_hash(4, 7, |_| {});
        assert_ne!(base, compute_state_hash(5, 7, |_| {}));
        assert_ne!(base, compute_state_hash(4, 8, |_| {}));
    }

    #[test]
    fn test_state_and_input_domains_differ() {
        let mut state = StateHasher::for_round_state();
        let mut inputs = StateHasher::for_inputs();
        state.update_u32(9);
        inputs.update_u32(9);
        assert_ne!(state.finalize(), inputs.finalize());
    }
}
