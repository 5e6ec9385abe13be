//! Poseidon commitment hash over the BN254 scalar field.
//!
//! One parameter set per absorbed arity: an arity-N input is hashed with the
//! rate-N configuration, so `H([x])` and `H([x, 0])` use different round
//! constants and can never collide by padding. This mirrors the circuit
//! side, where `Poseidon(n)` instantiates the width-(n+1) permutation.
//!
//! Bit-exactness with the proving circuits is asserted at startup against a
//! reference vector shipped next to the verification keys; see
//! [`check_reference_vector`].

use ark_crypto_primitives::sponge::poseidon::{
    find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge,
};
use ark_crypto_primitives::sponge::{CryptographicSponge, FieldBasedCryptographicSponge};
use ark_ff::PrimeField;
use once_cell::sync::Lazy;

use super::error::CryptoError;
use super::BaseField;

/// Largest tuple the commitment hash absorbs in one permutation.
pub const MAX_ARITY: usize = 16;

const FULL_ROUNDS: usize = 8;
const ALPHA: u64 = 5;

/// Partial-round schedule per state width `t = arity + 1`, the schedule the
/// circuit toolchain uses for widths 2..=17.
const PARTIAL_ROUNDS: [usize; MAX_ARITY] = [
    56, 57, 56, 60, 60, 63, 64, 63, 60, 66, 60, 65, 70, 60, 64, 68,
];

/// Poseidon configuration for a given absorbed arity (rate = arity,
/// capacity 1, alpha = 5, 8 full rounds).
pub fn poseidon_config(arity: usize) -> Result<PoseidonConfig<BaseField>, CryptoError> {
    if arity == 0 || arity > MAX_ARITY {
        return Err(CryptoError::UnsupportedArity(arity));
    }
    let partial_rounds = PARTIAL_ROUNDS[arity - 1];
    let (ark, mds) = find_poseidon_ark_and_mds::<BaseField>(
        BaseField::MODULUS_BIT_SIZE as u64,
        arity,
        FULL_ROUNDS as u64,
        partial_rounds as u64,
        0,
    );
    Ok(PoseidonConfig::new(
        FULL_ROUNDS,
        partial_rounds,
        ALPHA,
        mds,
        ark,
        arity,
        1,
    ))
}

static CONFIGS: Lazy<Vec<PoseidonConfig<BaseField>>> = Lazy::new(|| {
    (1..=MAX_ARITY)
        .map(|arity| poseidon_config(arity).expect("arity within supported range"))
        .collect()
});

/// `H: F_p^n -> F_p` for `n` in 1..=16. The arity is part of the hash
/// domain, so callers must pass exactly the fields they mean to commit to.
pub fn hash_fields(inputs: &[BaseField]) -> Result<BaseField, CryptoError> {
    if inputs.is_empty() || inputs.len() > MAX_ARITY {
        return Err(CryptoError::UnsupportedArity(inputs.len()));
    }
    let config = &CONFIGS[inputs.len() - 1];
    let mut sponge = PoseidonSponge::new(config);
    for input in inputs {
        sponge.absorb(input);
    }
    Ok(sponge.squeeze_native_field_elements(1)[0])
}

/// Hash of a two-element tuple; the Merkle node combiner.
pub fn hash_two(left: BaseField, right: BaseField) -> BaseField {
    hash_fields(&[left, right]).expect("arity 2 is supported")
}

/// A reference input/digest pair derived from the proving circuits.
#[derive(Clone, Debug)]
pub struct ReferenceVector {
    pub inputs: Vec<BaseField>,
    pub digest: BaseField,
}

/// Asserts the native hash reproduces the circuit hash on a known vector.
/// The coordinator refuses to serve when this fails: a divergent hash would
/// silently reject every proof.
pub fn check_reference_vector(vector: &ReferenceVector) -> Result<(), CryptoError> {
    let computed = hash_fields(&vector.inputs)?;
    if computed != vector.digest {
        return Err(CryptoError::ReferenceVectorMismatch {
            expected: vector.digest.to_string(),
            computed: computed.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    #[test]
    fn deterministic_across_calls() {
        let inputs = [BaseField::from(1u64), BaseField::from(2u64)];
        assert_eq!(hash_fields(&inputs).unwrap(), hash_fields(&inputs).unwrap());
    }

    #[test]
    fn arity_is_part_of_the_domain() {
        let one = [BaseField::from(7u64)];
        let padded = [BaseField::from(7u64), BaseField::zero()];
        assert_ne!(hash_fields(&one).unwrap(), hash_fields(&padded).unwrap());
    }

    #[test]
    fn rejects_oversized_tuples() {
        let inputs = vec![BaseField::zero(); MAX_ARITY + 1];
        assert!(matches!(
            hash_fields(&inputs),
            Err(CryptoError::UnsupportedArity(_))
        ));
    }

    #[test]
    fn reference_vector_round_trips() {
        let inputs = vec![BaseField::from(3u64), BaseField::from(4u64)];
        let digest = hash_fields(&inputs).unwrap();
        let vector = ReferenceVector { inputs, digest };
        assert!(check_reference_vector(&vector).is_ok());
    }
}
