//! Groth16 proof verification: circuit registry, verification-key cache,
//! and the decimal-string proof format emitted by the circuit toolchain.

pub mod groth16;
pub mod verifier;

pub use groth16::{parse_proof, parse_verifying_key, ProofJson, VerifyingKeyJson};
pub use verifier::{ProofVerifier, VerifierRegistry, VerifyError};

use serde::{Deserialize, Serialize};

/// The eight circuits of the protocol. Closed on purpose: verification keys
/// are selected from a fixed-size table keyed on the variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitType {
    Shuffle,
    Reshuffle,
    AddKeys,
    Mask,
    Unmask,
    GameAction,
    HandEval,
    Showdown,
}

impl CircuitType {
    pub const COUNT: usize = 8;

    pub const ALL: [CircuitType; Self::COUNT] = [
        CircuitType::Shuffle,
        CircuitType::Reshuffle,
        CircuitType::AddKeys,
        CircuitType::Mask,
        CircuitType::Unmask,
        CircuitType::GameAction,
        CircuitType::HandEval,
        CircuitType::Showdown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CircuitType::Shuffle => "shuffle",
            CircuitType::Reshuffle => "reshuffle",
            CircuitType::AddKeys => "add_keys",
            CircuitType::Mask => "mask",
            CircuitType::Unmask => "unmask",
            CircuitType::GameAction => "game_action",
            CircuitType::HandEval => "hand_eval",
            CircuitType::Showdown => "showdown",
        }
    }

    pub fn from_str(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_names_round_trip() {
        for circuit in CircuitType::ALL {
            assert_eq!(CircuitType::from_str(circuit.as_str()), Some(circuit));
        }
        assert_eq!(CircuitType::from_str("bogus"), None);
    }
}
