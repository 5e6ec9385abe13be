//! Client-side proving driver: witness assembly for every circuit and the
//! player automaton that reacts to coordinator messages.
//!
//! The Groth16 prover itself is an external collaborator behind
//! [`ProverBackend`]; this module prepares its inputs from the same crypto
//! core the coordinator verifies with.

pub mod client;
pub mod witness;

use async_trait::async_trait;
use thiserror::Error;

use crate::proofs::{CircuitType, ProofJson};

pub use client::{CheckCallStrategy, PlayerClient, Strategy, TurnInfo};
pub use witness::{
    prepare_add_keys, prepare_hand_eval, prepare_mask, prepare_shuffle, prepare_unmask,
    AddKeysWitness, GameActionWitness, HandEvalWitness, MaskWitness, ShowdownWitness,
    ShuffleWitness, UnmaskWitness, WitnessBundle,
};

#[derive(Error, Debug)]
pub enum ProverError {
    #[error("witness assembly failed: {0}")]
    Witness(String),

    #[error("proving backend failed: {0}")]
    Backend(String),
}

/// A proof plus the public signals it binds, as submitted on the wire.
#[derive(Clone, Debug)]
pub struct ProofBundle {
    pub proof: ProofJson,
    pub public_signals: Vec<String>,
}

/// The external proving system. Implementations wrap the circuit toolchain;
/// tests substitute a stub that returns the witness's own public signals.
#[async_trait]
pub trait ProverBackend: Send + Sync {
    async fn prove(
        &self,
        circuit: CircuitType,
        witness: &WitnessBundle,
    ) -> Result<ProofBundle, ProverError>;
}

/// Backend stub: a structurally valid but unverifiable proof carrying the
/// witness's public signals. Useful against a coordinator with verification
/// stubbed, and in tests.
pub struct StubProver;

#[async_trait]
impl ProverBackend for StubProver {
    async fn prove(
        &self,
        _circuit: CircuitType,
        witness: &WitnessBundle,
    ) -> Result<ProofBundle, ProverError> {
        Ok(ProofBundle {
            proof: ProofJson {
                pi_a: vec!["0".into(), "0".into()],
                pi_b: vec![vec!["0".into(), "0".into()], vec!["0".into(), "0".into()]],
                pi_c: vec!["0".into(), "0".into()],
            },
            public_signals: witness.public_signals(),
        })
    }
}
