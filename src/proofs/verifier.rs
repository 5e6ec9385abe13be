//! Verification-key cache and the Groth16 verify adapter.

use std::fs;
use std::path::Path;

use anyhow::Context;
use ark_bn254::Bn254;
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey};
use ark_snark::SNARK;
use thiserror::Error;
use tracing::info;

use crate::crypto::BaseField;

use super::groth16::{parse_proof, parse_verifying_key, ProofJson, VerifyingKeyJson};
use super::CircuitType;

const LOG_TARGET: &str = "proofs::verifier";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("unknown circuit")]
    UnknownCircuit,

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("public signal count mismatch: key expects {expected}, got {got}")]
    PublicSignalMismatch { expected: usize, got: usize },

    #[error("verification key for {0:?} is not loaded")]
    KeyNotLoaded(CircuitType),

    #[error("proof did not verify")]
    Invalid,
}

/// Seam the coordinator verifies through; lets the room logic be exercised
/// without circuit artifacts.
pub trait ProofVerifier: Send + Sync {
    fn verify(
        &self,
        circuit: CircuitType,
        proof: &ProofJson,
        public_signals: &[BaseField],
    ) -> Result<(), VerifyError>;
}

/// One prepared verification key per circuit, loaded at startup and
/// immutable for the life of the process.
pub struct VerifierRegistry {
    keys: [Option<PreparedVerifyingKey<Bn254>>; CircuitType::COUNT],
}

impl VerifierRegistry {
    pub fn empty() -> Self {
        Self {
            keys: Default::default(),
        }
    }

    /// Loads `<circuit>.vkey.json` for every circuit from the artifacts
    /// directory. All eight must be present; a coordinator with a partial
    /// key set would accept some transitions unverifiable.
    pub fn load_from_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut registry = Self::empty();
        for circuit in CircuitType::ALL {
            let path = dir.join(format!("{}.vkey.json", circuit.as_str()));
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading verification key {}", path.display()))?;
            let json: VerifyingKeyJson = serde_json::from_str(&raw)
                .with_context(|| format!("parsing verification key {}", path.display()))?;
            let vk = parse_verifying_key(&json)
                .with_context(|| format!("decoding verification key {}", path.display()))?;
            registry.insert(circuit, prepare_verifying_key(&vk));
            info!(
                target: LOG_TARGET,
                circuit = circuit.as_str(),
                "verification key loaded"
            );
        }
        Ok(registry)
    }

    pub fn insert(&mut self, circuit: CircuitType, key: PreparedVerifyingKey<Bn254>) {
        self.keys[circuit.index()] = Some(key);
    }

    pub fn public_input_len(&self, circuit: CircuitType) -> Option<usize> {
        self.keys[circuit.index()]
            .as_ref()
            .map(|pvk| pvk.vk.gamma_abc_g1.len() - 1)
    }
}

impl ProofVerifier for VerifierRegistry {
    fn verify(
        &self,
        circuit: CircuitType,
        proof: &ProofJson,
        public_signals: &[BaseField],
    ) -> Result<(), VerifyError> {
        let pvk = self.keys[circuit.index()]
            .as_ref()
            .ok_or(VerifyError::KeyNotLoaded(circuit))?;

        let expected = pvk.vk.gamma_abc_g1.len() - 1;
        if public_signals.len() != expected {
            return Err(VerifyError::PublicSignalMismatch {
                expected,
                got: public_signals.len(),
            });
        }

        let proof = parse_proof(proof).map_err(|err| VerifyError::MalformedProof(err.to_string()))?;

        match Groth16::<Bn254>::verify_with_processed_vk(pvk, public_signals, &proof) {
            Ok(true) => Ok(()),
            Ok(false) => Err(VerifyError::Invalid),
            Err(err) => Err(VerifyError::MalformedProof(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_proof() -> ProofJson {
        ProofJson {
            pi_a: vec!["0".into(), "0".into(), "0".into()],
            pi_b: vec![
                vec!["0".into(), "0".into()],
                vec!["0".into(), "0".into()],
                vec!["0".into(), "0".into()],
            ],
            pi_c: vec!["0".into(), "0".into(), "0".into()],
        }
    }

    #[test]
    fn missing_key_is_reported_as_not_loaded() {
        let registry = VerifierRegistry::empty();
        let err = registry.verify(CircuitType::Shuffle, &dummy_proof(), &[]);
        assert_eq!(err, Err(VerifyError::KeyNotLoaded(CircuitType::Shuffle)));
    }
}
