//! Generation of the 7462 hand equivalence classes and their global ranks.
//!
//! `basic` covers every non-flush class (6175 entries), `flush` every suited
//! class (1287). Ranks are global across both lists: 0 is the royal flush,
//! 7461 the worst high card. Lower rank is the better hand.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::crypto::{hash_fields, BaseField, CryptoError};

use super::classify::{classify_ranks, pack_score, HandCategory};
use super::{Rank, RANK_PRIMES};

pub const TOTAL_CLASSES: usize = 7462;
pub const BASIC_CLASSES: usize = 6175;
pub const FLUSH_CLASSES: usize = 1287;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandClass {
    pub prime_product: u64,
    pub rank: u16,
    pub category: HandCategory,
    pub is_flush: bool,
}

impl HandClass {
    /// Leaf pre-image: `H(primeProduct, rank, isFlush)`.
    pub fn leaf_hash(&self) -> Result<BaseField, CryptoError> {
        hash_fields(&[
            BaseField::from(self.prime_product),
            BaseField::from(u64::from(self.rank)),
            BaseField::from(u64::from(self.is_flush)),
        ])
    }
}

pub struct HandRankTables {
    /// Non-flush classes ordered by ascending global rank.
    pub basic: Vec<HandClass>,
    /// Flush classes ordered by ascending global rank.
    pub flush: Vec<HandClass>,
    basic_by_key: HashMap<u64, u16>,
    flush_by_key: HashMap<u64, u16>,
    basic_leaf_by_key: HashMap<u64, usize>,
    flush_leaf_by_key: HashMap<u64, usize>,
}

impl HandRankTables {
    pub fn rank_of(&self, prime_product: u64, is_flush: bool) -> Option<u16> {
        if is_flush {
            self.flush_by_key.get(&prime_product).copied()
        } else {
            self.basic_by_key.get(&prime_product).copied()
        }
    }

    /// Position of a class inside its own table, i.e. its Merkle leaf index.
    pub fn leaf_index_of(&self, prime_product: u64, is_flush: bool) -> Option<usize> {
        if is_flush {
            self.flush_leaf_by_key.get(&prime_product).copied()
        } else {
            self.basic_leaf_by_key.get(&prime_product).copied()
        }
    }

    pub fn class_of(&self, prime_product: u64, is_flush: bool) -> Option<&HandClass> {
        let index = self.leaf_index_of(prime_product, is_flush)?;
        if is_flush {
            self.flush.get(index)
        } else {
            self.basic.get(index)
        }
    }

    /// The pinned artifact format: decimal prime-product string -> rank.
    pub fn to_rank_map(&self, is_flush: bool) -> HashMap<String, u16> {
        let list = if is_flush { &self.flush } else { &self.basic };
        list.iter()
            .map(|class| (class.prime_product.to_string(), class.rank))
            .collect()
    }
}

struct ClassSeed {
    prime_product: u64,
    category: HandCategory,
    is_flush: bool,
    score: u32,
}

fn enumerate_classes() -> Vec<ClassSeed> {
    let mut seeds = Vec::with_capacity(TOTAL_CLASSES);

    // Rank multisets r1 >= r2 >= ... >= r5 with multiplicity at most 4.
    for r1 in 2..=14u8 {
        for r2 in 2..=r1 {
            for r3 in 2..=r2 {
                for r4 in 2..=r3 {
                    for r5 in 2..=r4 {
                        let ranks: [Rank; 5] = [r1, r2, r3, r4, r5];
                        let max_mult = (2..=14u8)
                            .map(|rank| ranks.iter().filter(|&&x| x == rank).count())
                            .max()
                            .unwrap_or(0);
                        if max_mult > 4 {
                            continue;
                        }
                        let prime_product: u64 = ranks
                            .iter()
                            .map(|&rank| RANK_PRIMES[(rank - 2) as usize])
                            .product();

                        let (category, tiebreak) = classify_ranks(ranks, false);
                        seeds.push(ClassSeed {
                            prime_product,
                            category,
                            is_flush: false,
                            score: pack_score(category, tiebreak),
                        });

                        let all_distinct = max_mult == 1;
                        if all_distinct {
                            let (category, tiebreak) = classify_ranks(ranks, true);
                            seeds.push(ClassSeed {
                                prime_product,
                                category,
                                is_flush: true,
                                score: pack_score(category, tiebreak),
                            });
                        }
                    }
                }
            }
        }
    }
    seeds
}

fn build_tables() -> HandRankTables {
    let mut seeds = enumerate_classes();
    assert_eq!(seeds.len(), TOTAL_CLASSES, "hand class enumeration drifted");

    // Global ranking: strongest hand first, rank = position.
    seeds.sort_by(|a, b| b.score.cmp(&a.score));

    let mut basic = Vec::with_capacity(BASIC_CLASSES);
    let mut flush = Vec::with_capacity(FLUSH_CLASSES);
    for (position, seed) in seeds.iter().enumerate() {
        let class = HandClass {
            prime_product: seed.prime_product,
            rank: position as u16,
            category: seed.category,
            is_flush: seed.is_flush,
        };
        if seed.is_flush {
            flush.push(class);
        } else {
            basic.push(class);
        }
    }
    assert_eq!(basic.len(), BASIC_CLASSES);
    assert_eq!(flush.len(), FLUSH_CLASSES);

    let basic_by_key = basic
        .iter()
        .map(|class| (class.prime_product, class.rank))
        .collect();
    let flush_by_key = flush
        .iter()
        .map(|class| (class.prime_product, class.rank))
        .collect();
    let basic_leaf_by_key = basic
        .iter()
        .enumerate()
        .map(|(i, class)| (class.prime_product, i))
        .collect();
    let flush_leaf_by_key = flush
        .iter()
        .enumerate()
        .map(|(i, class)| (class.prime_product, i))
        .collect();

    HandRankTables {
        basic,
        flush,
        basic_by_key,
        flush_by_key,
        basic_leaf_by_key,
        flush_leaf_by_key,
    }
}

static TABLES: Lazy<HandRankTables> = Lazy::new(build_tables);

/// Process-wide immutable tables.
pub fn tables() -> &'static HandRankTables {
    &TABLES
}

/// Both class tables committed as Merkle trees.
pub struct RankTrees {
    pub basic: super::merkle::MerkleTree,
    pub flush: super::merkle::MerkleTree,
}

fn build_trees() -> RankTrees {
    let t = tables();
    let basic_leaves: Vec<BaseField> = t
        .basic
        .iter()
        .map(|class| class.leaf_hash().expect("leaf hashes"))
        .collect();
    let flush_leaves: Vec<BaseField> = t
        .flush
        .iter()
        .map(|class| class.leaf_hash().expect("leaf hashes"))
        .collect();
    RankTrees {
        basic: super::merkle::MerkleTree::from_leaves(basic_leaves),
        flush: super::merkle::MerkleTree::from_leaves(flush_leaves),
    }
}

static TREES: Lazy<RankTrees> = Lazy::new(build_trees);

/// Process-wide immutable Merkle trees over the class tables. Building them
/// costs ~16k Poseidon permutations, done once at first use.
pub fn rank_trees() -> &'static RankTrees {
    &TREES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::lookup_key;
    use crate::ranking::{card_index, Suit};

    #[test]
    fn class_counts_match_the_combinatorics() {
        let t = tables();
        assert_eq!(t.basic.len(), BASIC_CLASSES);
        assert_eq!(t.flush.len(), FLUSH_CLASSES);
    }

    #[test]
    fn royal_flush_is_rank_zero() {
        let key = lookup_key(&[
            card_index(14, Suit::Spades),
            card_index(13, Suit::Spades),
            card_index(12, Suit::Spades),
            card_index(11, Suit::Spades),
            card_index(10, Suit::Spades),
        ]);
        assert_eq!(tables().rank_of(key, true), Some(0));
    }

    #[test]
    fn worst_high_card_is_rank_7461() {
        // 7-5-4-3-2 unsuited is the weakest class.
        let key: u64 = [7u8, 5, 4, 3, 2]
            .iter()
            .map(|&rank| RANK_PRIMES[(rank - 2) as usize])
            .product();
        assert_eq!(tables().rank_of(key, false), Some(7461));
    }

    #[test]
    fn flush_beats_its_unsuited_twin() {
        let key: u64 = [14u8, 12, 9, 7, 2]
            .iter()
            .map(|&rank| RANK_PRIMES[(rank - 2) as usize])
            .product();
        let suited = tables().rank_of(key, true).unwrap();
        let unsuited = tables().rank_of(key, false).unwrap();
        assert!(suited < unsuited);
    }

    #[test]
    fn ranks_are_a_permutation_of_the_class_space() {
        let t = tables();
        let mut seen = vec![false; TOTAL_CLASSES];
        for class in t.basic.iter().chain(t.flush.iter()) {
            assert!(!seen[class.rank as usize], "duplicate global rank");
            seen[class.rank as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn tables_are_rank_sorted() {
        let t = tables();
        assert!(t.basic.windows(2).all(|w| w[0].rank < w[1].rank));
        assert!(t.flush.windows(2).all(|w| w[0].rank < w[1].rank));
    }

    #[test]
    fn rank_map_artifact_uses_decimal_keys() {
        let map = tables().to_rank_map(true);
        assert_eq!(map.len(), FLUSH_CLASSES);
        assert_eq!(map.get("31367009"), Some(&0u16)); // A·K·Q·J·T primes
    }

    #[test]
    #[ignore = "walks all 7462 classes through tree build and path verify"]
    fn every_class_round_trips_through_its_tree() {
        use crate::ranking::merkle::verify_path;
        let t = tables();
        let trees = rank_trees();
        for (list, tree) in [(&t.basic, &trees.basic), (&t.flush, &trees.flush)] {
            let root = tree.root();
            for (leaf_index, class) in list.iter().enumerate() {
                let leaf = class.leaf_hash().unwrap();
                let path = tree.path(leaf_index).unwrap();
                assert!(
                    verify_path(root, leaf, &path),
                    "class with key {} failed its membership proof",
                    class.prime_product
                );
            }
        }
    }
}
