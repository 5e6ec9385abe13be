//! Witness assembly per circuit.
//!
//! Each `prepare_*` performs the protocol operation natively (the same
//! algebra the circuit constrains), collects the private witness, and
//! derives the public signals the coordinator will check against its own
//! commitments.

use rand::{CryptoRng, Rng, RngCore};

use crate::cards::{commit_deck, CardOpError, MaskedCard, DECK_SIZE};
use crate::crypto::curve::random_scalar;
use crate::crypto::{BaseField, CryptoError, CurvePoint, ScalarField};
use crate::game::GameSnapshot;
use crate::ranking::evaluate_seven;
use crate::ranking::merkle::MerklePath;
use crate::ranking::tables::{rank_trees, tables};

use super::ProverError;

impl From<CardOpError> for ProverError {
    fn from(err: CardOpError) -> Self {
        ProverError::Witness(err.to_string())
    }
}

impl From<CryptoError> for ProverError {
    fn from(err: CryptoError) -> Self {
        ProverError::Witness(err.to_string())
    }
}

/// Permutation-and-remask witness for the shuffle and reshuffle circuits.
pub struct ShuffleWitness {
    pub permutation: [usize; DECK_SIZE],
    pub secret: ScalarField,
    pub nonces: Box<[ScalarField; DECK_SIZE]>,
    pub deck_before: Box<[MaskedCard; DECK_SIZE]>,
    pub deck_after: Box<[MaskedCard; DECK_SIZE]>,
    pub commitment_before: BaseField,
    pub commitment_after: BaseField,
    pub public_key: CurvePoint,
}

/// Fisher-Yates permutation, fresh nonces, and
/// `out[i] = add_and_mask(in[perm[i]], s, nonce_i)`.
pub fn prepare_shuffle<R: RngCore + CryptoRng>(
    deck_before: &[MaskedCard; DECK_SIZE],
    secret: &ScalarField,
    rng: &mut R,
) -> Result<ShuffleWitness, ProverError> {
    let mut permutation: [usize; DECK_SIZE] = core::array::from_fn(|i| i);
    for i in (1..DECK_SIZE).rev() {
        let j = rng.gen_range(0..=i);
        permutation.swap(i, j);
    }
    let nonces: Box<[ScalarField; DECK_SIZE]> =
        Box::new(core::array::from_fn(|_| random_scalar(rng)));

    let mut after = Vec::with_capacity(DECK_SIZE);
    for i in 0..DECK_SIZE {
        after.push(deck_before[permutation[i]].add_and_mask(secret, &nonces[i])?);
    }
    let deck_after: Box<[MaskedCard; DECK_SIZE]> =
        after.try_into().map(Box::new).expect("deck sized");

    let commitment_before = commit_deck(deck_before)?;
    let commitment_after = commit_deck(&deck_after)?;
    Ok(ShuffleWitness {
        permutation,
        secret: *secret,
        nonces,
        deck_before: Box::new(*deck_before),
        deck_after,
        commitment_before,
        commitment_after,
        public_key: CurvePoint::mul_generator(secret),
    })
}

/// Key-joining witness for the non-shuffling `add_keys` circuit: adds
/// `s·G` to every card's joint key without permuting. The per-card
/// `pk_was_identity` flags select the circuit's addition rule.
pub struct AddKeysWitness {
    pub secret: ScalarField,
    pub pk_was_identity: [bool; DECK_SIZE],
    pub deck_before: Box<[MaskedCard; DECK_SIZE]>,
    pub deck_after: Box<[MaskedCard; DECK_SIZE]>,
    pub commitment_before: BaseField,
    pub commitment_after: BaseField,
    pub public_key: CurvePoint,
}

pub fn prepare_add_keys(
    deck_before: &[MaskedCard; DECK_SIZE],
    secret: &ScalarField,
) -> Result<AddKeysWitness, ProverError> {
    let pk_was_identity: [bool; DECK_SIZE] =
        core::array::from_fn(|i| deck_before[i].pk.is_identity());
    let mut after = Vec::with_capacity(DECK_SIZE);
    for card in deck_before.iter() {
        after.push(card.add_player_to_mask(secret)?);
    }
    let deck_after: Box<[MaskedCard; DECK_SIZE]> =
        after.try_into().map(Box::new).expect("deck sized");
    Ok(AddKeysWitness {
        secret: *secret,
        pk_was_identity,
        commitment_before: commit_deck(deck_before)?,
        commitment_after: commit_deck(&deck_after)?,
        deck_before: Box::new(*deck_before),
        deck_after,
        public_key: CurvePoint::mul_generator(secret),
    })
}

/// Single-card re-mask witness.
pub struct MaskWitness {
    pub nonce: ScalarField,
    pub card_before: MaskedCard,
    pub card_after: MaskedCard,
    pub input_commitment: BaseField,
    pub output_commitment: BaseField,
}

pub fn prepare_mask(
    card: &MaskedCard,
    nonce: &ScalarField,
) -> Result<MaskWitness, ProverError> {
    let card_after = card.mask(nonce)?;
    Ok(MaskWitness {
        nonce: *nonce,
        card_before: *card,
        card_after,
        input_commitment: card.commitment()?,
        output_commitment: card_after.commitment()?,
    })
}

/// Partial-unmask witness: proves `out = partial_unmask(in, s)` with
/// `playerPub = s·G`, without identifying which card index this is.
pub struct UnmaskWitness {
    pub secret: ScalarField,
    pub card_before: MaskedCard,
    pub card_after: MaskedCard,
    pub input_commitment: BaseField,
    pub output_commitment: BaseField,
    pub public_key: CurvePoint,
}

pub fn prepare_unmask(
    card: &MaskedCard,
    secret: &ScalarField,
) -> Result<UnmaskWitness, ProverError> {
    let card_after = card.partial_unmask(secret)?;
    Ok(UnmaskWitness {
        secret: *secret,
        card_before: *card,
        card_after,
        input_commitment: card.commitment()?,
        output_commitment: card_after.commitment()?,
        public_key: CurvePoint::mul_generator(secret),
    })
}

/// Betting-action witness over the committed game state.
pub struct GameActionWitness {
    pub snapshot_before: GameSnapshot,
    pub snapshot_after: GameSnapshot,
    pub commitment_before: BaseField,
    pub commitment_after: BaseField,
    pub action: u8,
    pub amount: u64,
    /// Acting seat plus one, as the circuit encodes the current player.
    pub current_player: u64,
}

/// Hand-rank witness: five selections out of seven, the prime-product
/// lookup key, and the Merkle path of the claimed equivalence class.
pub struct HandEvalWitness {
    pub hole_values: [u8; 2],
    pub board_values: [u8; 5],
    pub chosen: [u8; 5],
    /// Selection flags over `[hole_0, hole_1, board_0..4]`; exactly five set.
    pub use_flags: [bool; 7],
    pub key: u64,
    pub rank: u16,
    pub is_flush: bool,
    pub merkle_path: MerklePath,
    pub merkle_root: BaseField,
    pub hole_commitment: BaseField,
    pub board_commitment: BaseField,
}

pub fn prepare_hand_eval(
    hole_values: [u8; 2],
    board_values: [u8; 5],
    hole_commitment: BaseField,
) -> Result<HandEvalWitness, ProverError> {
    let seven = [
        hole_values[0],
        hole_values[1],
        board_values[0],
        board_values[1],
        board_values[2],
        board_values[3],
        board_values[4],
    ];
    let best = evaluate_seven(seven);
    let rank = tables()
        .rank_of(best.key, best.is_flush)
        .ok_or_else(|| ProverError::Witness("hand class not in tables".into()))?;
    let leaf_index = tables()
        .leaf_index_of(best.key, best.is_flush)
        .expect("class indexed");
    let trees = rank_trees();
    let (tree, root) = if best.is_flush {
        (&trees.flush, trees.flush.root())
    } else {
        (&trees.basic, trees.basic.root())
    };
    let merkle_path = tree
        .path(leaf_index)
        .ok_or_else(|| ProverError::Witness("leaf index out of range".into()))?;

    let use_flags: [bool; 7] = core::array::from_fn(|i| best.indices.contains(&seven[i]));
    debug_assert_eq!(use_flags.iter().filter(|&&u| u).count(), 5);

    let board_fields: Vec<BaseField> = board_values
        .iter()
        .map(|&v| BaseField::from(u64::from(v)))
        .collect();
    let board_commitment =
        crate::crypto::hash_fields(&board_fields).map_err(ProverError::from)?;

    Ok(HandEvalWitness {
        hole_values,
        board_values,
        chosen: best.indices,
        use_flags,
        key: best.key,
        rank,
        is_flush: best.is_flush,
        merkle_path,
        merkle_root: root,
        hole_commitment,
        board_commitment,
    })
}

/// Showdown comparison witness: the revealed ranks and the winner set the
/// circuit confirms (lower rank wins, ties share).
pub struct ShowdownWitness {
    pub revealed_ranks: Vec<u16>,
    pub winner_flags: Vec<bool>,
}

/// The private witness plus its public signals, handed to the backend.
pub enum WitnessBundle {
    Shuffle(ShuffleWitness),
    AddKeys(AddKeysWitness),
    Mask(MaskWitness),
    Unmask(UnmaskWitness),
    GameAction(GameActionWitness),
    HandEval(HandEvalWitness),
    Showdown(ShowdownWitness),
}

impl WitnessBundle {
    /// The public signals in the order the verifier checks them.
    pub fn public_signals(&self) -> Vec<String> {
        match self {
            WitnessBundle::Shuffle(w) => vec![
                w.commitment_before.to_string(),
                w.commitment_after.to_string(),
                w.public_key.x.to_string(),
                w.public_key.y.to_string(),
            ],
            WitnessBundle::AddKeys(w) => vec![
                w.commitment_before.to_string(),
                w.commitment_after.to_string(),
                w.public_key.x.to_string(),
                w.public_key.y.to_string(),
            ],
            WitnessBundle::Mask(w) => vec![
                w.input_commitment.to_string(),
                w.output_commitment.to_string(),
            ],
            WitnessBundle::Unmask(w) => vec![
                w.input_commitment.to_string(),
                w.output_commitment.to_string(),
                w.public_key.x.to_string(),
                w.public_key.y.to_string(),
            ],
            WitnessBundle::GameAction(w) => vec![
                w.commitment_before.to_string(),
                w.commitment_after.to_string(),
                u64::from(w.action).to_string(),
                w.amount.to_string(),
                w.current_player.to_string(),
            ],
            WitnessBundle::HandEval(w) => vec![
                w.merkle_root.to_string(),
                w.hole_commitment.to_string(),
                w.board_commitment.to_string(),
                u64::from(w.rank).to_string(),
                u64::from(w.is_flush).to_string(),
            ],
            WitnessBundle::Showdown(w) => w
                .revealed_ranks
                .iter()
                .map(|rank| u64::from(*rank).to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{card_index_of_point, initial_deck};
    use crate::ranking::merkle::verify_path;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn shuffle_witness_is_a_permutation_and_recovers_values() {
        let mut rng = StdRng::seed_from_u64(31);
        let secret = random_scalar(&mut rng);
        let deck = initial_deck();
        let witness = prepare_shuffle(&deck, &secret, &mut rng).unwrap();

        // The permutation hits every index exactly once.
        let mut seen = [false; DECK_SIZE];
        for &i in witness.permutation.iter() {
            assert!(!seen[i], "repeated index in permutation");
            seen[i] = true;
        }

        // Unmasking any output card recovers the value at its source slot.
        for i in [0usize, 17, 51] {
            let open = witness.deck_after[i].partial_unmask(&secret).unwrap();
            let value = card_index_of_point(&open.msg).unwrap();
            assert_eq!(value as usize, witness.permutation[i]);
        }
    }

    #[test]
    fn unmask_witness_binds_both_commitments() {
        let mut rng = StdRng::seed_from_u64(32);
        let secret = random_scalar(&mut rng);
        let nonce = random_scalar(&mut rng);
        let card = MaskedCard::face_up(9).add_and_mask(&secret, &nonce).unwrap();

        let witness = prepare_unmask(&card, &secret).unwrap();
        assert_eq!(witness.input_commitment, card.commitment().unwrap());
        assert_eq!(
            witness.output_commitment,
            witness.card_after.commitment().unwrap()
        );
        assert!(witness.card_after.pk.is_identity());
    }

    #[test]
    fn add_keys_leaves_messages_untouched_on_a_fresh_deck() {
        let mut rng = StdRng::seed_from_u64(33);
        let secret = random_scalar(&mut rng);
        let deck = initial_deck();
        let witness = prepare_add_keys(&deck, &secret).unwrap();
        assert!(witness.pk_was_identity.iter().all(|&b| b));
        for (before, after) in witness.deck_before.iter().zip(witness.deck_after.iter()) {
            assert_eq!(before.msg, after.msg);
            assert_eq!(before.epk, after.epk);
            assert!(!after.pk.is_identity());
        }
    }

    #[test]
    fn hand_eval_witness_carries_a_verifying_merkle_path() {
        // A♠ K♠ with the royal board completes the rank-0 flush-tree leaf.
        use crate::ranking::{card_index, Suit};
        let hole = [card_index(14, Suit::Spades), card_index(13, Suit::Spades)];
        let board = [
            card_index(12, Suit::Spades),
            card_index(11, Suit::Spades),
            card_index(10, Suit::Spades),
            card_index(2, Suit::Hearts),
            card_index(2, Suit::Diamonds),
        ];
        let witness = prepare_hand_eval(hole, board, BaseField::from(7u64)).unwrap();
        assert_eq!(witness.rank, 0);
        assert!(witness.is_flush);

        let class = tables().class_of(witness.key, true).unwrap();
        assert!(verify_path(
            witness.merkle_root,
            class.leaf_hash().unwrap(),
            &witness.merkle_path
        ));
    }

    #[test]
    fn royal_flush_beats_four_of_a_kind_across_trees() {
        // Same board, two hands: the flush-tree rank must be strictly lower
        // (better) than the quads' basic-tree rank.
        use crate::ranking::{card_index, Suit};
        let board = [
            card_index(12, Suit::Spades),
            card_index(11, Suit::Spades),
            card_index(10, Suit::Spades),
            card_index(2, Suit::Hearts),
            card_index(2, Suit::Diamonds),
        ];
        let royal = prepare_hand_eval(
            [card_index(14, Suit::Spades), card_index(13, Suit::Spades)],
            board,
            BaseField::from(1u64),
        )
        .unwrap();
        let quads = prepare_hand_eval(
            [card_index(2, Suit::Clubs), card_index(2, Suit::Spades)],
            board,
            BaseField::from(2u64),
        )
        .unwrap();
        assert!(royal.is_flush);
        assert!(!quads.is_flush);
        assert!(royal.rank < quads.rank, "lower rank is the better hand");
    }
}
