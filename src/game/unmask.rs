//! Per-card unmask tracking.
//!
//! Hole cards need every player except the owner; requests fan out in
//! parallel and the finished card goes to the owner alone. Community cards
//! need every mask holder, one at a time, because each unmask witness is
//! built against the card's current state; the finished card is broadcast.

use std::collections::{BTreeSet, VecDeque};

use thiserror::Error;

use crate::cards::MaskedCard;
use crate::crypto::{BaseField, CryptoError};
use crate::protocol::PlayerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardOwner {
    Player(PlayerId),
    Community,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnmaskError {
    #[error("player already unmasked this card")]
    AlreadyContributed,

    #[error("player is not required to unmask this card")]
    NotRequired,

    #[error("community unmasking is sequential; not this player's turn")]
    OutOfTurn,

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

#[derive(Clone, Debug)]
pub struct UnmaskTracker {
    /// Deck position, not card value.
    pub card_index: u8,
    pub owner: CardOwner,
    pub card: MaskedCard,
    /// Commitment of `card`; the next unmask proof's declared input.
    pub commitment: BaseField,
    contributors: BTreeSet<PlayerId>,
    /// Remaining unmaskers, in request order. Hole cards drain in any
    /// order; community cards strictly front-first.
    pending: VecDeque<PlayerId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnmaskProgress {
    pub remaining: u8,
    pub complete: bool,
}

impl UnmaskTracker {
    pub fn new(
        card_index: u8,
        owner: CardOwner,
        card: MaskedCard,
        unmaskers: Vec<PlayerId>,
    ) -> Result<Self, CryptoError> {
        let commitment = card.commitment()?;
        Ok(Self {
            card_index,
            owner,
            card,
            commitment,
            contributors: BTreeSet::new(),
            pending: unmaskers.into(),
        })
    }

    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn remaining(&self) -> u8 {
        self.pending.len() as u8
    }

    pub fn contributors(&self) -> impl Iterator<Item = &PlayerId> {
        self.contributors.iter()
    }

    pub fn is_pending_for(&self, player: &PlayerId) -> bool {
        self.pending.contains(player)
    }

    /// The player whose unmask is currently awaited; for community cards
    /// only the queue front may submit.
    pub fn next_community_unmasker(&self) -> Option<PlayerId> {
        self.pending.front().copied()
    }

    /// Records a verified partial unmask and the card's new state.
    pub fn apply(
        &mut self,
        player: PlayerId,
        card: MaskedCard,
    ) -> Result<UnmaskProgress, UnmaskError> {
        if self.contributors.contains(&player) {
            return Err(UnmaskError::AlreadyContributed);
        }
        if !self.pending.contains(&player) {
            return Err(UnmaskError::NotRequired);
        }
        if self.owner == CardOwner::Community && self.pending.front() != Some(&player) {
            return Err(UnmaskError::OutOfTurn);
        }

        self.pending.retain(|p| *p != player);
        self.contributors.insert(player);
        self.commitment = card.commitment()?;
        self.card = card;
        Ok(UnmaskProgress {
            remaining: self.remaining(),
            complete: self.pending.is_empty(),
        })
    }

    /// Drops a forfeited player from the queue; returns whether the card
    /// can still complete (it cannot once a mask holder is gone, the caller
    /// aborts the hand).
    pub fn remove_pending(&mut self, player: &PlayerId) -> bool {
        let was_pending = self.pending.contains(player);
        self.pending.retain(|p| p != player);
        !was_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::MaskedCard;
    use crate::crypto::curve::random_scalar;
    use crate::crypto::ScalarField;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn masked_card(secrets: &[ScalarField]) -> MaskedCard {
        let mut rng = StdRng::seed_from_u64(77);
        let mut card = MaskedCard::face_up(5);
        for secret in secrets {
            let nonce = random_scalar(&mut rng);
            card = card.add_and_mask(secret, &nonce).unwrap();
        }
        card
    }

    #[test]
    fn hole_tracker_accepts_any_order_and_completes() {
        let mut rng = StdRng::seed_from_u64(1);
        let secrets: Vec<ScalarField> = (0..3).map(|_| random_scalar(&mut rng)).collect();
        let players: Vec<PlayerId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let card = masked_card(&secrets);

        // Owner is a fourth player; all three mask holders must unmask.
        let owner = Uuid::new_v4();
        let mut tracker = UnmaskTracker::new(
            0,
            CardOwner::Player(owner),
            card,
            players.clone(),
        )
        .unwrap();

        // Apply in reverse registration order; hole cards do not sequence.
        let mut current = card;
        for (i, player) in players.iter().enumerate().rev() {
            let next = current.partial_unmask(&secrets[i]).unwrap();
            let progress = tracker.apply(*player, next).unwrap();
            current = next;
            assert_eq!(progress.complete, i == 0);
        }
        assert!(tracker.is_complete());
    }

    #[test]
    fn community_tracker_enforces_queue_order() {
        let mut rng = StdRng::seed_from_u64(2);
        let secrets: Vec<ScalarField> = (0..2).map(|_| random_scalar(&mut rng)).collect();
        let players: Vec<PlayerId> = (0..2).map(|_| Uuid::new_v4()).collect();
        let card = masked_card(&secrets);

        let mut tracker =
            UnmaskTracker::new(4, CardOwner::Community, card, players.clone()).unwrap();
        assert_eq!(tracker.next_community_unmasker(), Some(players[0]));

        let out_of_turn = card.partial_unmask(&secrets[1]).unwrap();
        assert_eq!(
            tracker.apply(players[1], out_of_turn),
            Err(UnmaskError::OutOfTurn)
        );

        let first = card.partial_unmask(&secrets[0]).unwrap();
        let progress = tracker.apply(players[0], first).unwrap();
        assert!(!progress.complete);
        assert_eq!(tracker.next_community_unmasker(), Some(players[1]));
    }

    #[test]
    fn double_contribution_is_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let secret = random_scalar(&mut rng);
        let player = Uuid::new_v4();
        let card = masked_card(&[secret]);

        let mut tracker =
            UnmaskTracker::new(0, CardOwner::Player(Uuid::new_v4()), card, vec![player]).unwrap();
        let open = card.partial_unmask(&secret).unwrap();
        tracker.apply(player, open).unwrap();
        assert_eq!(
            tracker.apply(player, open),
            Err(UnmaskError::AlreadyContributed)
        );
    }
}
