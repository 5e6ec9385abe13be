//! Order-independent deck commitment.

use crate::crypto::{BaseField, CryptoError};
use ark_ff::One;

use super::masked::MaskedCard;

pub const DECK_SIZE: usize = 52;

/// The starting deck: every card face up at its own index, no mask layers.
pub fn initial_deck() -> [MaskedCard; DECK_SIZE] {
    core::array::from_fn(|i| MaskedCard::face_up(i as u8))
}

/// `D = Π (cardCommitment(c_i) + 1)` in the commitment field. Multiplication
/// commutes, so any permutation of the same multiset of cards commits to the
/// same value; a shuffle proof shows the multiset is preserved without
/// exposing the permutation.
pub fn commit_deck(cards: &[MaskedCard; DECK_SIZE]) -> Result<BaseField, CryptoError> {
    let mut acc = BaseField::one();
    for card in cards {
        acc *= card.commitment()? + BaseField::one();
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::random_scalar;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    #[test]
    fn commitment_is_permutation_invariant() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut deck = initial_deck();
        // Mask every card so commitments are not trivially symmetric.
        let secret = random_scalar(&mut rng);
        for card in deck.iter_mut() {
            let nonce = random_scalar(&mut rng);
            *card = card.add_and_mask(&secret, &nonce).unwrap();
        }
        let before = commit_deck(&deck).unwrap();

        let mut shuffled = deck;
        shuffled.shuffle(&mut rng);
        assert_eq!(before, commit_deck(&shuffled).unwrap());
    }

    #[test]
    fn commitment_detects_card_substitution() {
        let deck = initial_deck();
        let before = commit_deck(&deck).unwrap();

        let mut tampered = deck;
        tampered[0] = MaskedCard::face_up(1);
        assert_ne!(before, commit_deck(&tampered).unwrap());
    }
}
