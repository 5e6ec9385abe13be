//! Native classification of 5-card hands and best-of-7 selection.
//!
//! Works on rank multisets plus a flush flag, which is exactly the
//! granularity of the equivalence-class tables: suits only matter through
//! "all five share one".

use super::{card_prime, decode_card, lookup_key, CardIndex, Rank};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

impl HandCategory {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn describe(self) -> &'static str {
        match self {
            HandCategory::HighCard => "High Card",
            HandCategory::OnePair => "One Pair",
            HandCategory::TwoPair => "Two Pair",
            HandCategory::ThreeOfAKind => "Three of a Kind",
            HandCategory::Straight => "Straight",
            HandCategory::Flush => "Flush",
            HandCategory::FullHouse => "Full House",
            HandCategory::FourOfAKind => "Four of a Kind",
            HandCategory::StraightFlush => "Straight Flush",
        }
    }
}

// Base-16 digit multipliers for packing (cat, c1..c5); higher score wins.
const M5: u32 = 1_048_576;
const M4: u32 = 65_536;
const M3: u32 = 4_096;
const M2: u32 = 256;
const M1: u32 = 16;
const M0: u32 = 1;

#[inline]
pub fn pack_score(category: HandCategory, c: [u8; 5]) -> u32 {
    u32::from(category.as_u8()) * M5
        + u32::from(c[0]) * M4
        + u32::from(c[1]) * M3
        + u32::from(c[2]) * M2
        + u32::from(c[3]) * M1
        + u32::from(c[4]) * M0
}

#[inline]
fn is_wheel(r: &[Rank; 5]) -> bool {
    r == &[14, 5, 4, 3, 2]
}

#[inline]
fn is_run_desc(r: &[Rank; 5]) -> bool {
    r[0] == r[1] + 1 && r[1] == r[2] + 1 && r[2] == r[3] + 1 && r[3] == r[4] + 1
}

/// Classify five ranks (any order) plus a flush flag into the hand category
/// and its tie-break digit vector.
pub fn classify_ranks(ranks: [Rank; 5], flush: bool) -> (HandCategory, [u8; 5]) {
    let mut r = ranks;
    r.sort_unstable_by(|a, b| b.cmp(a));

    let mut count = [0u8; 15];
    for rank in r {
        count[rank as usize] += 1;
    }

    let distinct = {
        let mut uniq = r.to_vec();
        uniq.dedup();
        uniq
    };

    let straight_high: Option<Rank> = if distinct.len() == 5 {
        if is_run_desc(&r) {
            Some(r[0])
        } else if is_wheel(&r) {
            Some(5)
        } else {
            None
        }
    } else {
        None
    };

    if flush {
        debug_assert_eq!(distinct.len(), 5, "a flush has five distinct ranks");
        return match straight_high {
            Some(high) => (HandCategory::StraightFlush, [high, 0, 0, 0, 0]),
            None => (HandCategory::Flush, [r[0], r[1], r[2], r[3], r[4]]),
        };
    }

    // Quads
    if let Some(&quad) = distinct.iter().find(|&&rank| count[rank as usize] == 4) {
        let kicker = *distinct.iter().find(|&&rank| rank != quad).unwrap();
        return (HandCategory::FourOfAKind, [quad, kicker, 0, 0, 0]);
    }

    // Full house
    let trips: Vec<Rank> = distinct
        .iter()
        .copied()
        .filter(|&rank| count[rank as usize] == 3)
        .collect();
    if let Some(&t) = trips.first() {
        if let Some(&p) = distinct
            .iter()
            .find(|&&rank| rank != t && count[rank as usize] >= 2)
        {
            return (HandCategory::FullHouse, [t, p, 0, 0, 0]);
        }
    }

    if let Some(high) = straight_high {
        return (HandCategory::Straight, [high, 0, 0, 0, 0]);
    }

    // Trips
    if let Some(&t) = trips.first() {
        let kickers: Vec<Rank> = distinct.iter().copied().filter(|&rank| rank != t).collect();
        return (HandCategory::ThreeOfAKind, [t, kickers[0], kickers[1], 0, 0]);
    }

    // Pairs
    let pairs: Vec<Rank> = distinct
        .iter()
        .copied()
        .filter(|&rank| count[rank as usize] == 2)
        .collect();
    match pairs.len() {
        2 => {
            let kicker = *distinct
                .iter()
                .find(|&&rank| rank != pairs[0] && rank != pairs[1])
                .unwrap();
            (HandCategory::TwoPair, [pairs[0], pairs[1], kicker, 0, 0])
        }
        1 => {
            let kickers: Vec<Rank> = distinct
                .iter()
                .copied()
                .filter(|&rank| rank != pairs[0])
                .collect();
            (
                HandCategory::OnePair,
                [pairs[0], kickers[0], kickers[1], kickers[2], 0],
            )
        }
        _ => (HandCategory::HighCard, [r[0], r[1], r[2], r[3], r[4]]),
    }
}

/// The winning selection out of seven cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BestFive {
    pub indices: [CardIndex; 5],
    pub category: HandCategory,
    pub is_flush: bool,
    pub key: u64,
    pub score: u32,
}

/// Enumerate the 21 five-card subsets of `{hole, board}` and keep the
/// strongest by packed score.
pub fn evaluate_seven(cards: [CardIndex; 7]) -> BestFive {
    let mut best: Option<BestFive> = None;
    for a in 0..3 {
        for b in (a + 1)..4 {
            for c in (b + 1)..5 {
                for d in (c + 1)..6 {
                    for e in (d + 1)..7 {
                        let indices = [cards[a], cards[b], cards[c], cards[d], cards[e]];
                        let decoded = indices.map(decode_card);
                        let ranks = decoded.map(|card| card.rank);
                        let flush = decoded.iter().all(|card| card.suit == decoded[0].suit);
                        let (category, tiebreak) = classify_ranks(ranks, flush);
                        let score = pack_score(category, tiebreak);
                        let candidate = BestFive {
                            indices,
                            category,
                            is_flush: flush,
                            key: indices.iter().map(|&i| card_prime(i)).product(),
                            score,
                        };
                        if best.map_or(true, |prev| score > prev.score) {
                            best = Some(candidate);
                        }
                    }
                }
            }
        }
    }
    let best = best.expect("seven cards yield at least one hand");
    debug_assert_eq!(best.key, lookup_key(&best.indices));
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{card_index, Suit};

    #[test]
    fn wheel_is_a_five_high_straight() {
        let (cat, tie) = classify_ranks([14, 2, 3, 4, 5], false);
        assert_eq!(cat, HandCategory::Straight);
        assert_eq!(tie[0], 5);
    }

    #[test]
    fn royal_flush_outranks_everything() {
        let (royal, tie) = classify_ranks([14, 13, 12, 11, 10], true);
        assert_eq!(royal, HandCategory::StraightFlush);
        let royal_score = pack_score(royal, tie);

        let (quads, qt) = classify_ranks([14, 14, 14, 14, 13], false);
        assert_eq!(quads, HandCategory::FourOfAKind);
        assert!(royal_score > pack_score(quads, qt));
    }

    #[test]
    fn full_house_reads_trips_then_pair() {
        let (cat, tie) = classify_ranks([13, 13, 14, 14, 14], false);
        assert_eq!(cat, HandCategory::FullHouse);
        assert_eq!(&tie[..2], &[14, 13]);
    }

    #[test]
    fn best_of_seven_prefers_the_flush() {
        // Hole A♠ K♠ on Q♠ J♠ T♠ 2♥ 2♦: the royal flush must win over the
        // aces-and-kings nothing and the deuce pair.
        let cards = [
            card_index(14, Suit::Spades),
            card_index(13, Suit::Spades),
            card_index(12, Suit::Spades),
            card_index(11, Suit::Spades),
            card_index(10, Suit::Spades),
            card_index(2, Suit::Hearts),
            card_index(2, Suit::Diamonds),
        ];
        let best = evaluate_seven(cards);
        assert_eq!(best.category, HandCategory::StraightFlush);
        assert!(best.is_flush);
    }

    #[test]
    fn kicker_order_breaks_pair_ties() {
        let (_, high_kick) = classify_ranks([14, 14, 13, 12, 11], false);
        let (_, low_kick) = classify_ranks([14, 14, 13, 12, 10], false);
        assert!(
            pack_score(HandCategory::OnePair, high_kick)
                > pack_score(HandCategory::OnePair, low_kick)
        );
    }
}
