pub mod curve;
pub mod error;
pub mod poseidon;

pub use curve::{CurvePoint, ScalarField};
pub use error::CryptoError;
pub use poseidon::{hash_fields, poseidon_config};

/// The commitment field: the BN254 scalar field, which is also the base
/// field of BabyJubJub. Every commitment and every Groth16 public signal
/// lives here.
pub type BaseField = ark_ed_on_bn254::Fq;
