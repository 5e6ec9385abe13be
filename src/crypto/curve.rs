//! BabyJubJub point arithmetic.
//!
//! The group is the prime-order subgroup of the twisted Edwards curve
//! `ark-ed-on-bn254`, whose base field is the BN254 scalar field. Points
//! carry an explicit infinity flag: the Edwards identity (0, 1) is a valid
//! affine point, and the commitment scheme hashes identity coordinates as
//! (0, 0), so "no mask layer present" has to be distinguishable from an
//! ordinary point.

use ark_ec::{CurveGroup, Group};
use ark_ed_on_bn254::{EdwardsAffine, EdwardsProjective};
use ark_ff::{One, PrimeField, UniformRand, Zero};
use rand::{CryptoRng, RngCore};

use super::error::CryptoError;
use super::BaseField;

/// Scalars modulo the subgroup order `L`.
pub type ScalarField = ark_ed_on_bn254::Fr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurvePoint {
    pub x: BaseField,
    pub y: BaseField,
    pub infinity: bool,
}

impl CurvePoint {
    /// The group identity, kept distinct from its affine encoding (0, 1).
    pub fn identity() -> Self {
        Self {
            x: BaseField::zero(),
            y: BaseField::one(),
            infinity: true,
        }
    }

    pub fn generator() -> Self {
        Self::from_projective(EdwardsProjective::generator())
    }

    /// Validates declared affine coordinates. (0, 1) normalizes to the
    /// explicit identity; anything else must satisfy the curve equation and
    /// land in the prime-order subgroup.
    pub fn new(x: BaseField, y: BaseField) -> Result<Self, CryptoError> {
        if x.is_zero() && y.is_one() {
            return Ok(Self::identity());
        }
        let affine = EdwardsAffine::new_unchecked(x, y);
        if !affine.is_on_curve() {
            return Err(CryptoError::InvalidPoint {
                x: x.to_string(),
                y: y.to_string(),
            });
        }
        if !affine.is_in_correct_subgroup_assuming_on_curve() {
            return Err(CryptoError::NotInSubgroup {
                x: x.to_string(),
                y: y.to_string(),
            });
        }
        Ok(Self {
            x,
            y,
            infinity: false,
        })
    }

    pub fn from_projective(point: EdwardsProjective) -> Self {
        if point.is_zero() {
            return Self::identity();
        }
        let affine = point.into_affine();
        Self {
            x: affine.x,
            y: affine.y,
            infinity: false,
        }
    }

    pub fn to_projective(self) -> EdwardsProjective {
        if self.infinity {
            EdwardsProjective::zero()
        } else {
            EdwardsAffine::new_unchecked(self.x, self.y).into()
        }
    }

    pub fn is_identity(&self) -> bool {
        self.infinity
    }

    pub fn is_on_curve(&self) -> bool {
        self.infinity || EdwardsAffine::new_unchecked(self.x, self.y).is_on_curve()
    }

    /// Complete twisted Edwards addition; `P + (-P)` yields the explicit
    /// identity.
    pub fn add(&self, other: &CurvePoint) -> CurvePoint {
        Self::from_projective(self.to_projective() + other.to_projective())
    }

    /// `-P = (-x, y)` on twisted Edwards.
    pub fn negate(&self) -> CurvePoint {
        if self.infinity {
            return *self;
        }
        Self {
            x: -self.x,
            y: self.y,
            infinity: false,
        }
    }

    pub fn sub(&self, other: &CurvePoint) -> CurvePoint {
        self.add(&other.negate())
    }

    /// Scalar multiplication. Not constant time: arkworks' double-and-add
    /// leaks the scalar's bit pattern through timing, so secret scalars must
    /// only be processed on hosts the key owner controls.
    pub fn scalar_mul(&self, k: &ScalarField) -> CurvePoint {
        Self::from_projective(self.to_projective() * *k)
    }

    /// `k * G`. Same timing caveat as [`CurvePoint::scalar_mul`].
    pub fn mul_generator(k: &ScalarField) -> CurvePoint {
        Self::from_projective(EdwardsProjective::generator() * *k)
    }

    /// Coordinates as absorbed by the commitment hash: identity maps to
    /// (0, 0), not to its affine encoding (0, 1).
    pub fn hash_coords(&self) -> (BaseField, BaseField) {
        if self.infinity {
            (BaseField::zero(), BaseField::zero())
        } else {
            (self.x, self.y)
        }
    }
}

/// Uniform scalar in `[0, L)` from a CSPRNG.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> ScalarField {
    ScalarField::rand(rng)
}

/// Embeds a scalar into the commitment field. The subgroup order is smaller
/// than the BN254 scalar field, so this never truncates.
pub fn scalar_to_base(scalar: &ScalarField) -> BaseField {
    use ark_ff::BigInteger;
    BaseField::from_le_bytes_mod_order(&scalar.into_bigint().to_bytes_le())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::test_rng;

    #[test]
    fn generator_is_on_curve_and_in_subgroup() {
        let g = CurvePoint::generator();
        assert!(!g.is_identity());
        assert!(CurvePoint::new(g.x, g.y).is_ok());
    }

    #[test]
    fn point_plus_negation_is_identity() {
        let mut rng = test_rng();
        let k = ScalarField::rand(&mut rng);
        let p = CurvePoint::mul_generator(&k);
        assert_eq!(p.add(&p.negate()), CurvePoint::identity());
    }

    #[test]
    fn scalar_mul_matches_repeated_addition() {
        let g = CurvePoint::generator();
        let five = g.scalar_mul(&ScalarField::from(5u64));
        let mut acc = CurvePoint::identity();
        for _ in 0..5 {
            acc = acc.add(&g);
        }
        assert_eq!(five, acc);
    }

    #[test]
    fn identity_encoding_normalizes() {
        let p = CurvePoint::new(BaseField::zero(), BaseField::one()).unwrap();
        assert!(p.is_identity());
        assert_eq!(p.hash_coords(), (BaseField::zero(), BaseField::zero()));
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let err = CurvePoint::new(BaseField::from(7u64), BaseField::from(11u64));
        assert!(matches!(err, Err(CryptoError::InvalidPoint { .. })));
    }
}
