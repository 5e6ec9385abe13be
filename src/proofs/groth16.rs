//! Conversion between the toolchain's decimal-string JSON layout and
//! arkworks Groth16 types over BN254.

use std::str::FromStr;

use ark_bn254::{Bn254, Fq, Fq2, G1Affine, G2Affine};
use ark_groth16::{Proof, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofParseError {
    #[error("malformed base-field element: {0}")]
    BadFieldElement(String),

    #[error("expected {expected} coordinates, got {got}")]
    BadCoordinateCount { expected: usize, got: usize },

    #[error("point is not on the curve")]
    OffCurve,

    #[error("point is outside the prime-order subgroup")]
    OutsideSubgroup,

    #[error("projective z-coordinate must be 0 or 1, got {0}")]
    BadProjectiveTail(String),
}

/// Proof layout produced by the proving toolchain: affine coordinates as
/// decimal strings, G1 points optionally carrying a projective `"1"` tail.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofJson {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
}

/// Verification-key layout as serialized by the proving toolchain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyingKeyJson {
    #[serde(default)]
    pub protocol: Option<String>,
    pub vk_alpha_1: Vec<String>,
    pub vk_beta_2: Vec<Vec<String>>,
    pub vk_gamma_2: Vec<Vec<String>>,
    pub vk_delta_2: Vec<Vec<String>>,
    #[serde(rename = "IC")]
    pub ic: Vec<Vec<String>>,
}

fn parse_fq(s: &str) -> Result<Fq, ProofParseError> {
    Fq::from_str(s.trim()).map_err(|_| ProofParseError::BadFieldElement(s.to_string()))
}

fn parse_g1(coords: &[String]) -> Result<G1Affine, ProofParseError> {
    match coords.len() {
        2 => {}
        3 => match coords[2].trim() {
            "1" => {}
            "0" => return Ok(G1Affine::identity()),
            other => return Err(ProofParseError::BadProjectiveTail(other.to_string())),
        },
        got => {
            return Err(ProofParseError::BadCoordinateCount { expected: 2, got });
        }
    }
    let point = G1Affine::new_unchecked(parse_fq(&coords[0])?, parse_fq(&coords[1])?);
    if !point.is_on_curve() {
        return Err(ProofParseError::OffCurve);
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ProofParseError::OutsideSubgroup);
    }
    Ok(point)
}

fn parse_fq2(pair: &[String]) -> Result<Fq2, ProofParseError> {
    if pair.len() != 2 {
        return Err(ProofParseError::BadCoordinateCount {
            expected: 2,
            got: pair.len(),
        });
    }
    Ok(Fq2::new(parse_fq(&pair[0])?, parse_fq(&pair[1])?))
}

fn parse_g2(coords: &[Vec<String>]) -> Result<G2Affine, ProofParseError> {
    match coords.len() {
        2 => {}
        3 => {
            // Projective tail [1, 0] marks affine, [0, 0] the identity.
            let tail = parse_fq2(&coords[2])?;
            if tail == Fq2::new(Fq::from(0u64), Fq::from(0u64)) {
                return Ok(G2Affine::identity());
            }
            if tail != Fq2::new(Fq::from(1u64), Fq::from(0u64)) {
                return Err(ProofParseError::BadProjectiveTail(format!(
                    "{:?}",
                    coords[2]
                )));
            }
        }
        got => {
            return Err(ProofParseError::BadCoordinateCount { expected: 2, got });
        }
    }
    let point = G2Affine::new_unchecked(parse_fq2(&coords[0])?, parse_fq2(&coords[1])?);
    if !point.is_on_curve() {
        return Err(ProofParseError::OffCurve);
    }
    if !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ProofParseError::OutsideSubgroup);
    }
    Ok(point)
}

pub fn parse_proof(json: &ProofJson) -> Result<Proof<Bn254>, ProofParseError> {
    Ok(Proof {
        a: parse_g1(&json.pi_a)?,
        b: parse_g2(&json.pi_b)?,
        c: parse_g1(&json.pi_c)?,
    })
}

pub fn parse_verifying_key(json: &VerifyingKeyJson) -> Result<VerifyingKey<Bn254>, ProofParseError> {
    let gamma_abc_g1 = json
        .ic
        .iter()
        .map(|coords| parse_g1(coords))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(VerifyingKey {
        alpha_g1: parse_g1(&json.vk_alpha_1)?,
        beta_g2: parse_g2(&json.vk_beta_2)?,
        gamma_g2: parse_g2(&json.vk_gamma_2)?,
        delta_g2: parse_g2(&json.vk_delta_2)?,
        gamma_abc_g1,
    })
}
