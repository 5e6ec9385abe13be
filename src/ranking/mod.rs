//! Hand-rank equivalence classes, prime-product lookup keys, and the
//! Merkle commitment over the 7462 distinct 5-card hands.

use core::cmp::Ordering;

pub mod classify;
pub mod merkle;
pub mod tables;

pub use classify::{classify_ranks, evaluate_seven, pack_score, BestFive, HandCategory};
pub use merkle::{verify_path, MerklePath, MerkleTree, TREE_DEPTH};
pub use tables::{tables, HandClass, HandRankTables, BASIC_CLASSES, FLUSH_CLASSES, TOTAL_CLASSES};

pub type Rank = u8; // 2..=14, A = 14
pub type CardIndex = u8; // 0..=51

/// Primes addressing the thirteen ranks; a 5-card multiset's product is its
/// canonical identifier.
pub const RANK_PRIMES: [u64; 13] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41];

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Suit {
    Clubs = 0,
    Diamonds = 1,
    Hearts = 2,
    Spades = 3,
}

impl Suit {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Suit::Clubs,
            1 => Suit::Diamonds,
            2 => Suit::Hearts,
            3 => Suit::Spades,
            _ => panic!("invalid suit value: {value}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

/// Deterministic 0..52 -> Card mapping, suit-major: 0..12 clubs 2..A, then
/// diamonds, hearts, spades.
#[inline]
pub fn decode_card(index: CardIndex) -> Card {
    assert!(index < 52, "card index out of range");
    Card {
        rank: index % 13 + 2,
        suit: Suit::from_u8(index / 13),
    }
}

/// Inverse of [`decode_card`].
#[inline]
pub fn card_index(rank: Rank, suit: Suit) -> CardIndex {
    assert!((2..=14).contains(&rank));
    (suit as u8) * 13 + (rank - 2)
}

/// Prime for a card's rank.
#[inline]
pub fn card_prime(index: CardIndex) -> u64 {
    RANK_PRIMES[(index % 13) as usize]
}

/// Product of rank primes over a chosen 5-card hand.
pub fn lookup_key(indices: &[CardIndex; 5]) -> u64 {
    indices.iter().map(|&i| card_prime(i)).product()
}

/// Rank-desc, then suit-desc; the canonical presentation order.
pub fn sort_desc(cards: &mut [Card]) {
    cards.sort_by(|a, b| match b.rank.cmp(&a.rank) {
        Ordering::Equal => b.suit.cmp(&a.suit),
        o => o,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_mapping_round_trips() {
        for index in 0..52u8 {
            let card = decode_card(index);
            assert_eq!(card_index(card.rank, card.suit), index);
        }
    }

    #[test]
    fn lookup_key_ignores_suits() {
        // A♠ K♠ Q♠ J♠ T♠ and A♣ K♦ Q♥ J♠ T♣ share a key.
        let spades = [
            card_index(14, Suit::Spades),
            card_index(13, Suit::Spades),
            card_index(12, Suit::Spades),
            card_index(11, Suit::Spades),
            card_index(10, Suit::Spades),
        ];
        let mixed = [
            card_index(14, Suit::Clubs),
            card_index(13, Suit::Diamonds),
            card_index(12, Suit::Hearts),
            card_index(11, Suit::Spades),
            card_index(10, Suit::Clubs),
        ];
        assert_eq!(lookup_key(&spades), lookup_key(&mixed));
    }
}
