//! ElGamal card triple and the masking operations.
//!
//! A card is `(epk, msg, pk)`: the aggregate ephemeral key, the blinded
//! message point, and the joint public key of every player currently holding
//! a mask layer. The operations keep three invariants: `pk` is the sum of
//! added player keys, `epk` the sum of masking nonces times `G`, and fully
//! unmasking by every added player recovers `msg = card_value_point(index)`
//! with `pk` back at identity, in any unmask order.

use thiserror::Error;

use crate::crypto::{hash_fields, BaseField, CryptoError, CurvePoint, ScalarField};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardOpError {
    #[error("card has no mask participants, cannot mask")]
    NoParticipants,

    #[error("card is already fully unmasked")]
    AlreadyUnmasked,

    #[error("masked card carries an identity joint key")]
    PkAtInfinityUnexpected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskedCard {
    /// Aggregate ephemeral key, `(Σ nonces)·G`; identity if never masked.
    pub epk: CurvePoint,
    /// Masked message point.
    pub msg: CurvePoint,
    /// Joint public key of mask holders; identity if nobody holds a mask.
    pub pk: CurvePoint,
}

/// Deterministic card-index-to-point mapping, `(i + 1)·G` for `i` in 0..52.
pub fn card_value_point(index: u8) -> CurvePoint {
    debug_assert!(index < 52, "card index out of range");
    CurvePoint::mul_generator(&ScalarField::from(u64::from(index) + 1))
}

/// Inverts [`card_value_point`] by scanning the 52 candidates; used by the
/// client once a card is fully unmasked.
pub fn card_index_of_point(point: &CurvePoint) -> Option<u8> {
    (0..52).find(|&i| card_value_point(i) == *point)
}

impl MaskedCard {
    /// A face-up card: no ephemeral key, no participants, plain value point.
    pub fn face_up(index: u8) -> Self {
        Self {
            epk: CurvePoint::identity(),
            msg: card_value_point(index),
            pk: CurvePoint::identity(),
        }
    }

    /// `pk' = pk + s·G`; once the card carries an ephemeral key the message
    /// must absorb the new layer too: `msg' = msg + s·epk`.
    pub fn add_player_to_mask(&self, secret: &ScalarField) -> Result<Self, CardOpError> {
        if !self.epk.is_identity() && self.pk.is_identity() {
            // A well-formed card never reaches this: epk is only ever grown
            // by `mask`, which requires a participant.
            return Err(CardOpError::PkAtInfinityUnexpected);
        }
        let pk = self.pk.add(&CurvePoint::mul_generator(secret));
        let msg = if self.epk.is_identity() {
            self.msg
        } else {
            self.msg.add(&self.epk.scalar_mul(secret))
        };
        Ok(Self {
            epk: self.epk,
            msg,
            pk,
        })
    }

    /// `epk' = epk + ρ·G`, `msg' = msg + ρ·pk`. Requires a participant.
    pub fn mask(&self, nonce: &ScalarField) -> Result<Self, CardOpError> {
        if self.pk.is_identity() {
            return Err(CardOpError::NoParticipants);
        }
        Ok(Self {
            epk: self.epk.add(&CurvePoint::mul_generator(nonce)),
            msg: self.msg.add(&self.pk.scalar_mul(nonce)),
            pk: self.pk,
        })
    }

    /// `msg' = msg − s·epk`, `pk' = pk − s·G`. The last participant's unmask
    /// leaves `pk` at the explicit identity and `msg` at the value point.
    pub fn partial_unmask(&self, secret: &ScalarField) -> Result<Self, CardOpError> {
        if self.pk.is_identity() {
            return Err(CardOpError::AlreadyUnmasked);
        }
        Ok(Self {
            epk: self.epk,
            msg: self.msg.sub(&self.epk.scalar_mul(secret)),
            pk: self.pk.sub(&CurvePoint::mul_generator(secret)),
        })
    }

    /// Sequential composition used by the shuffle: join, then re-mask.
    pub fn add_and_mask(
        &self,
        secret: &ScalarField,
        nonce: &ScalarField,
    ) -> Result<Self, CardOpError> {
        self.add_player_to_mask(secret)?.mask(nonce)
    }

    /// Arity-6 Poseidon over the triple's coordinates; identity-valued
    /// points contribute (0, 0).
    pub fn commitment(&self) -> Result<BaseField, CryptoError> {
        let (ex, ey) = self.epk.hash_coords();
        let (mx, my) = self.msg.hash_coords();
        let (px, py) = self.pk.hash_coords();
        hash_fields(&[ex, ey, mx, my, px, py])
    }
}
