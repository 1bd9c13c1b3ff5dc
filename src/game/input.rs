//! Turn Inputs
//!
//! A round moves forward when the player clicks the lit square or its
//! deadline runs out. Threshold changes mid-round also alter the outcome.
//! The engine records every input that changed state so a round can be
//! replayed from its seed.

use serde::{Serialize, Deserialize};
use crate::core::hash::{StateHash, StateHasher};
use crate::game::state::SquareId;

/// An input that advanced the round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnInput {
    /// Player clicked a lit square
    Select {
        square: SquareId,
    },
    /// The turn deadline elapsed
    Expire,
    /// Finish threshold changed while the round was running
    SetMaxScore {
        max_score: u32,
    },
}

impl TurnInput {
    /// Stable one-byte tag used for hashing.
    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            TurnInput::Select { .. } => 0,
            TurnInput::Expire => 1,
            TurnInput::SetMaxScore { .. } => 2,
        }
    }
}

/// Hash an ordered input sequence.
pub fn hash_inputs(inputs: &[TurnInput]) -> StateHash {
    let mut hasher = StateHasher::for_inputs();
    hasher.update_u32(inputs.len() as u32);
    for input in inputs {
        hasher.update_u8(input.tag());
        match input {
            TurnInput::Select { square } => hasher.update_u32(*square),
            TurnInput::SetMaxScore { max_score } => hasher.update_u32(*max_score),
            TurnInput::Expire => {}
        }
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_inputs_order_sensitive() {
        let a = [TurnInput::Select { square: 1 }, TurnInput::Expire];
        let b = [TurnInput::Expire, TurnInput::Select { square: 1 }];

        assert_eq!(hash_inputs(&a), hash_inputs(&a));
        assert_ne!(hash_inputs(&a), hash_inputs(&b));
    }

    #[test]
    fn test_hash_inputs_square_sensitive() {
        let a = [TurnInput::Select { square: 1 }];
        let b = [TurnInput::Select { square: 2 }];

        assert_ne!(hash_inputs(&a), hash_inputs(&b));
    }
}
