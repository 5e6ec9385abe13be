//! Hand flow: shuffle round-robin, dealing, unmask coordination, betting,
//! showdown, and settlement. Every player-driven transition is gated on a
//! verified proof; coordinator-driven transitions are deterministic.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::cards::{card_index_of_point, commit_deck, initial_deck, MaskedCard, DECK_SIZE};
use crate::crypto::{hash_fields, BaseField};
use crate::engine::{
    advance_street, apply_action, compute_side_pots, distribute_pots, valid_actions, Action,
    AppliedAction, HandStatus, PlayerStatus, SeatId, Street, Transition,
};
use crate::proofs::{CircuitType, ProofJson, VerifyError};
use crate::protocol::codec::{parse_field, WireCard};
use crate::protocol::{
    ErrorCode, PlayerId, PotShare, ServerMessage, ShowdownPlayer, StackEntry, COMMUNITY_OWNER,
};
use crate::ranking::tables::tables;

use super::events::{Effect, PendingTransition, VerifyJob};
use super::phases::HandPhase;
use super::room::{HandReveal, Room, CRYPTO_STRIKE_LIMIT, LOG_TARGET};
use super::state_commitment::GameSnapshot;
use super::unmask::{CardOwner, UnmaskTracker};

impl Room {
    // ------------------------------------------------------------------
    // Hand start
    // ------------------------------------------------------------------

    pub(super) fn try_start_hand(&mut self) -> Vec<Effect> {
        if self.phase != HandPhase::Waiting {
            return Vec::new();
        }
        let eligible = self.eligible_seats();
        if (eligible.len() as u8) < self.config.min_players {
            return Vec::new();
        }
        let all_ready = eligible.iter().all(|(seat, _)| {
            self.player_at(*seat)
                .map(|entry| entry.ready)
                .unwrap_or(false)
        });
        if !all_ready {
            return Vec::new();
        }
        self.start_hand(eligible)
    }

    fn start_hand(&mut self, eligible: Vec<(SeatId, u64)>) -> Vec<Effect> {
        // Keep the dealer on an eligible seat before dealing.
        if !eligible.iter().any(|(seat, _)| *seat == self.dealer) {
            self.dealer = next_seat_in(&eligible, self.dealer).unwrap_or(eligible[0].0);
        }
        let betting = match crate::engine::BettingState::new_hand(
            self.config.stakes,
            self.dealer,
            eligible.clone(),
        ) {
            Ok(state) => state,
            Err(err) => {
                warn!(target: LOG_TARGET, room = %self.id, error = %err, "hand start failed");
                return Vec::new();
            }
        };

        self.hand_no += 1;
        self.betting = Some(betting);
        let deck = Box::new(initial_deck());
        self.deck_commitment = commit_deck(&deck).expect("initial deck commits");
        self.deck = Some(deck);
        self.shuffles_done = 0;
        self.mask_holders.clear();
        self.trackers.clear();
        self.hole_positions.clear();
        self.hole_commitments.clear();
        self.community_positions.clear();
        self.board_values.clear();
        self.reveals.clear();

        // Round-robin shuffle order, starting left of the dealer.
        let order: Vec<SeatId> = eligible.iter().map(|(seat, _)| *seat).collect();
        let dealer_pos = order.iter().position(|&s| s == self.dealer).unwrap();
        self.shuffle_queue = order[dealer_pos + 1..]
            .iter()
            .chain(order[..=dealer_pos].iter())
            .copied()
            .collect();

        info!(
            target: LOG_TARGET,
            room = %self.id,
            hand = self.hand_no,
            dealer = self.dealer,
            players = order.len(),
            "hand started"
        );

        let snapshot = GameSnapshot::of(self.betting());
        let mut effects = vec![Effect::Broadcast {
            message: ServerMessage::GameStarted {
                game_state: snapshot.to_wire(),
            },
        }];
        effects.extend(self.shuffle_turn_effects());
        effects
    }

    fn shuffle_turn_effects(&mut self) -> Vec<Effect> {
        let seat = self.shuffle_queue[0];
        self.phase = HandPhase::Shuffling { turn: seat };
        let player = self.player_at(seat).expect("shuffler seated").player;
        let deck = self.deck.as_ref().expect("deck present");
        let current_deck: Vec<WireCard> = deck.iter().map(WireCard::from).collect();
        vec![
            Effect::Broadcast {
                message: ServerMessage::ShuffleTurn {
                    player_id: player,
                    seat_index: seat,
                    current_deck,
                },
            },
            self.arm_phase_timer(),
        ]
    }

    // ------------------------------------------------------------------
    // Shuffle submission
    // ------------------------------------------------------------------

    pub(super) fn handle_submit_shuffle(
        &mut self,
        player: PlayerId,
        deck_wire: Vec<WireCard>,
        commitment_str: &str,
        proof: ProofJson,
        signals: Vec<String>,
    ) -> Vec<Effect> {
        let Some(seat) = self.seat_of(&player) else {
            return vec![self.error_to(player, ErrorCode::NotInRoom, "not seated here")];
        };
        let HandPhase::Shuffling { turn } = self.phase else {
            return vec![self.error_to(player, ErrorCode::InvalidState, "no shuffle in progress")];
        };
        if turn != seat {
            return vec![self.error_to(player, ErrorCode::NotYourTurn, "another seat shuffles")];
        }
        if self.pending_verify.contains(&player) {
            return vec![self.error_to(player, ErrorCode::Busy, "verification pending")];
        }
        if deck_wire.len() != DECK_SIZE {
            return vec![self.error_to(player, ErrorCode::InvalidMessage, "deck must have 52 cards")];
        }

        let mut cards = Vec::with_capacity(DECK_SIZE);
        for wire in &deck_wire {
            match wire.decode() {
                Ok(card) => cards.push(card),
                Err(detail) => {
                    return vec![self.error_to(player, ErrorCode::InvalidCard, detail)];
                }
            }
        }
        let deck: Box<[MaskedCard; DECK_SIZE]> =
            cards.try_into().map(Box::new).expect("length checked");

        let commitment = match parse_field(commitment_str) {
            Ok(value) => value,
            Err(detail) => {
                return vec![self.error_to(player, ErrorCode::InvalidMessage, detail)];
            }
        };
        match commit_deck(&deck) {
            Ok(computed) if computed == commitment => {}
            Ok(_) => {
                return vec![self.error_to(
                    player,
                    ErrorCode::CommitmentMismatch,
                    "deck commitment does not match the submitted deck",
                )];
            }
            Err(err) => {
                return vec![self.error_to(player, ErrorCode::InvalidCard, err.to_string())];
            }
        }

        let submitted = match parse_signals(&signals) {
            Ok(values) => values,
            Err(detail) => {
                return vec![self.error_to(player, ErrorCode::InvalidProof, detail)];
            }
        };
        let public_key = self.player_at(seat).expect("seated").public_key;
        let expected = vec![self.deck_commitment, commitment, public_key.x, public_key.y];
        if submitted != expected {
            return vec![self.error_to(
                player,
                ErrorCode::CommitmentMismatch,
                "public signals do not match the coordinator's commitments",
            )];
        }

        let circuit = if self.shuffles_done == 0 {
            CircuitType::Shuffle
        } else {
            CircuitType::Reshuffle
        };
        self.pending_verify.insert(player);
        vec![Effect::Verify(VerifyJob {
            player,
            circuit,
            proof,
            public_signals: submitted,
            pending: PendingTransition::Shuffle {
                seat,
                deck,
                commitment,
            },
        })]
    }

    fn apply_shuffle(
        &mut self,
        player: PlayerId,
        seat: SeatId,
        deck: Box<[MaskedCard; DECK_SIZE]>,
        commitment: BaseField,
    ) -> Vec<Effect> {
        match self.phase {
            HandPhase::Shuffling { turn } if turn == seat => {}
            _ => {
                warn!(target: LOG_TARGET, room = %self.id, %player, "stale shuffle result dropped");
                return Vec::new();
            }
        }
        self.deck = Some(deck);
        self.deck_commitment = commitment;
        self.shuffles_done += 1;
        self.mask_holders.push(player);
        self.shuffle_queue.remove(0);

        let mut effects = vec![Effect::Broadcast {
            message: ServerMessage::ShuffleComplete {
                player_id: player,
                deck_commitment: commitment.to_string(),
            },
        }];
        if self.shuffle_queue.is_empty() {
            effects.extend(self.deal());
        } else {
            effects.extend(self.shuffle_turn_effects());
        }
        effects
    }

    // ------------------------------------------------------------------
    // Dealing
    // ------------------------------------------------------------------

    /// Canonical deck positions: hole cards occupy `0..2N-1` in seat order,
    /// community cards `2N..2N+4`.
    fn deal(&mut self) -> Vec<Effect> {
        self.phase = HandPhase::Dealing;
        let participants = self.hand_participants();
        let n = participants.len() as u8;
        self.community_positions = (2 * n..2 * n + 5).collect();

        let mut effects = Vec::new();
        let deck: [MaskedCard; DECK_SIZE] = **self.deck.as_ref().expect("deck present");
        for (i, (_, player)) in participants.iter().enumerate() {
            let positions = [2 * i as u8, 2 * i as u8 + 1];
            self.hole_positions.insert(*player, positions);
            effects.push(Effect::Send {
                to: *player,
                message: ServerMessage::CardsDealt {
                    your_cards: positions.to_vec(),
                },
            });
            for position in positions {
                let unmaskers: Vec<PlayerId> = self
                    .mask_holders
                    .iter()
                    .copied()
                    .filter(|holder| holder != player)
                    .collect();
                let card = deck[position as usize];
                let tracker = UnmaskTracker::new(
                    position,
                    CardOwner::Player(*player),
                    card,
                    unmaskers.clone(),
                )
                .expect("card commits");
                for unmasker in &unmaskers {
                    effects.push(Effect::Send {
                        to: *unmasker,
                        message: ServerMessage::UnmaskRequest {
                            card_index: position,
                            for_player_id: player.to_string(),
                            card: WireCard::from(&card),
                        },
                    });
                }
                self.trackers.insert(position, tracker);
            }
        }
        self.phase = HandPhase::UnmaskingHole;
        effects.push(self.arm_phase_timer());
        effects
    }

    // ------------------------------------------------------------------
    // Unmask submission
    // ------------------------------------------------------------------

    pub(super) fn handle_submit_unmask(
        &mut self,
        player: PlayerId,
        card_index: u8,
        card_wire: WireCard,
        proof: ProofJson,
        signals: Vec<String>,
    ) -> Vec<Effect> {
        if self.seat_of(&player).is_none() {
            return vec![self.error_to(player, ErrorCode::NotInRoom, "not seated here")];
        }
        if !matches!(
            self.phase,
            HandPhase::UnmaskingHole | HandPhase::UnmaskingCommunity { .. }
        ) {
            return vec![self.error_to(player, ErrorCode::InvalidState, "no unmask in progress")];
        }
        if self.pending_verify.contains(&player) {
            return vec![self.error_to(player, ErrorCode::Busy, "verification pending")];
        }
        let Some(tracker) = self.trackers.get(&card_index) else {
            return vec![self.error_to(player, ErrorCode::InvalidCard, "no such card in play")];
        };
        if tracker.contributors().any(|p| *p == player) {
            return vec![self.error_to(player, ErrorCode::AlreadyUnmasked, "share already applied")];
        }
        if !tracker.is_pending_for(&player) {
            return vec![self.error_to(
                player,
                ErrorCode::InvalidUnmask,
                "player is not required on this card",
            )];
        }
        if tracker.owner == CardOwner::Community
            && tracker.next_community_unmasker() != Some(player)
        {
            return vec![self.error_to(
                player,
                ErrorCode::NotYourTurn,
                "community cards unmask sequentially",
            )];
        }

        let card = match card_wire.decode() {
            Ok(card) => card,
            Err(detail) => {
                return vec![self.error_to(player, ErrorCode::InvalidCard, detail)];
            }
        };
        let output_commitment = match card.commitment() {
            Ok(value) => value,
            Err(err) => {
                return vec![self.error_to(player, ErrorCode::InvalidCard, err.to_string())];
            }
        };

        let submitted = match parse_signals(&signals) {
            Ok(values) => values,
            Err(detail) => {
                return vec![self.error_to(player, ErrorCode::InvalidProof, detail)];
            }
        };
        let public_key = self
            .player_at(self.seat_of(&player).unwrap())
            .expect("seated")
            .public_key;
        let expected = vec![
            tracker.commitment,
            output_commitment,
            public_key.x,
            public_key.y,
        ];
        if submitted != expected {
            return vec![self.error_to(
                player,
                ErrorCode::CommitmentMismatch,
                "public signals do not match the card's commitments",
            )];
        }

        self.pending_verify.insert(player);
        vec![Effect::Verify(VerifyJob {
            player,
            circuit: CircuitType::Unmask,
            proof,
            public_signals: submitted,
            pending: PendingTransition::Unmask { card_index, card },
        })]
    }

    fn apply_unmask(&mut self, player: PlayerId, card_index: u8, card: MaskedCard) -> Vec<Effect> {
        if !matches!(
            self.phase,
            HandPhase::UnmaskingHole | HandPhase::UnmaskingCommunity { .. }
        ) {
            warn!(target: LOG_TARGET, room = %self.id, %player, "stale unmask result dropped");
            return Vec::new();
        }
        let Some(tracker) = self.trackers.get_mut(&card_index) else {
            return Vec::new();
        };
        let progress = match tracker.apply(player, card) {
            Ok(progress) => progress,
            Err(err) => {
                return vec![self.error_to(player, ErrorCode::InvalidUnmask, err.to_string())];
            }
        };
        let owner = tracker.owner;

        let mut effects = vec![Effect::Broadcast {
            message: ServerMessage::CardPartiallyUnmasked {
                card_index,
                by_player_id: player,
                remaining_unmasks: progress.remaining,
            },
        }];

        if !progress.complete {
            if owner == CardOwner::Community {
                // Sequential reveal: hand the baton to the next player.
                let tracker = self.trackers.get(&card_index).expect("tracker present");
                if let Some(next) = tracker.next_community_unmasker() {
                    effects.push(Effect::Send {
                        to: next,
                        message: ServerMessage::UnmaskRequest {
                            card_index,
                            for_player_id: COMMUNITY_OWNER.to_string(),
                            card: WireCard::from(&tracker.card),
                        },
                    });
                }
            }
            return effects;
        }

        match owner {
            CardOwner::Player(hole_owner) => {
                let tracker = self.trackers.get(&card_index).expect("tracker present");
                effects.push(Effect::Send {
                    to: hole_owner,
                    message: ServerMessage::CardFullyUnmasked {
                        card_index,
                        card: WireCard::from(&tracker.card),
                        is_community: None,
                    },
                });
                if self.trackers.values().all(|t| t.is_complete()) {
                    effects.extend(self.finish_hole_unmasking());
                }
            }
            CardOwner::Community => {
                let tracker = self.trackers.get(&card_index).expect("tracker present");
                let Some(value) = card_index_of_point(&tracker.card.msg) else {
                    warn!(
                        target: LOG_TARGET,
                        room = %self.id,
                        card_index,
                        "fully unmasked community card decodes to no card value"
                    );
                    effects.extend(self.abort_hand("community card failed to decode"));
                    return effects;
                };
                self.board_values.push(value);
                effects.push(Effect::Broadcast {
                    message: ServerMessage::CardFullyUnmasked {
                        card_index,
                        card: WireCard::from(&tracker.card),
                        is_community: Some(true),
                    },
                });
                if self.trackers.values().all(|t| t.is_complete()) {
                    effects.extend(self.finish_community_unmasking());
                }
            }
        }
        effects
    }

    /// All hole cards are out: pin each player's hole binding commitment
    /// (arity-2 hash over their two tracked card commitments) and open the
    /// preflop betting round.
    fn finish_hole_unmasking(&mut self) -> Vec<Effect> {
        let bindings: Vec<(PlayerId, BaseField)> = self
            .hole_positions
            .iter()
            .map(|(player, positions)| {
                let first = self.trackers[&positions[0]].commitment;
                let second = self.trackers[&positions[1]].commitment;
                let binding = hash_fields(&[first, second]).expect("arity 2 hash");
                (*player, binding)
            })
            .collect();
        self.hole_commitments.extend(bindings);
        self.trackers.clear();
        self.begin_betting(Street::Preflop)
    }

    fn finish_community_unmasking(&mut self) -> Vec<Effect> {
        let HandPhase::UnmaskingCommunity { street } = self.phase else {
            return Vec::new();
        };
        self.trackers.clear();
        let revealed = street.cards_revealed();
        let start = self.board_values.len() - revealed;
        let mut effects = vec![Effect::Broadcast {
            message: ServerMessage::StreetAdvanced {
                street: street.as_u8(),
                community_card_indices: self.board_values[start..].to_vec(),
            },
        }];
        effects.extend(self.begin_betting(street));
        effects
    }

    // ------------------------------------------------------------------
    // Betting
    // ------------------------------------------------------------------

    fn begin_betting(&mut self, street: Street) -> Vec<Effect> {
        if self.betting().betting_locked() {
            // Nobody can act; run the board out instead of betting.
            return self.handle_street_end();
        }
        self.phase = HandPhase::Betting { street };
        self.player_turn_effects()
    }

    fn player_turn_effects(&mut self) -> Vec<Effect> {
        let betting = self.betting();
        let seat = betting.to_act;
        let legals = valid_actions(betting, seat);
        let player = self.player_at(seat).expect("actor seated").player;
        let message = ServerMessage::PlayerTurn {
            player_id: player,
            seat_index: seat,
            valid_actions: legals.actions.iter().map(|a| a.as_u8()).collect(),
            min_bet: legals.min_bet,
            min_raise: legals.min_raise_to,
            amount_to_call: legals.amount_to_call,
            timeout_ms: self.config.turn_timeout.as_millis() as u64,
        };
        vec![Effect::Broadcast { message }, self.arm_turn_timer()]
    }

    pub(super) fn handle_submit_action(
        &mut self,
        player: PlayerId,
        action_type: u8,
        amount: u64,
        state_commitment_str: &str,
        proof: ProofJson,
        signals: Vec<String>,
    ) -> Vec<Effect> {
        let Some(seat) = self.seat_of(&player) else {
            return vec![self.error_to(player, ErrorCode::NotInRoom, "not seated here")];
        };
        let HandPhase::Betting { .. } = self.phase else {
            return vec![self.error_to(player, ErrorCode::InvalidState, "no betting in progress")];
        };
        if self.betting().to_act != seat {
            return vec![self.error_to(player, ErrorCode::NotYourTurn, "another seat acts")];
        }
        if self.pending_verify.contains(&player) {
            return vec![self.error_to(player, ErrorCode::Busy, "verification pending")];
        }
        let Some(action) = Action::from_u8(action_type) else {
            return vec![self.error_to(player, ErrorCode::InvalidAction, "unknown action code")];
        };

        // Probe the action on a copy; the real state only moves after the
        // proof verifies.
        let before = GameSnapshot::of(self.betting())
            .commitment()
            .expect("state commits");
        let mut probe = self.betting().clone();
        if let Err(err) = apply_action(&mut probe, seat, action, amount) {
            return vec![self.error_to(player, ErrorCode::InvalidAction, err.to_string())];
        }
        let after = GameSnapshot::of(&probe).commitment().expect("state commits");

        let declared = match parse_field(state_commitment_str) {
            Ok(value) => value,
            Err(detail) => {
                return vec![self.error_to(player, ErrorCode::InvalidMessage, detail)];
            }
        };
        if declared != after {
            return vec![self.error_to(
                player,
                ErrorCode::CommitmentMismatch,
                "declared state commitment does not match the transition",
            )];
        }

        let submitted = match parse_signals(&signals) {
            Ok(values) => values,
            Err(detail) => {
                return vec![self.error_to(player, ErrorCode::InvalidProof, detail)];
            }
        };
        let expected = vec![
            before,
            after,
            BaseField::from(u64::from(action_type)),
            BaseField::from(amount),
            BaseField::from(u64::from(seat) + 1),
        ];
        if submitted != expected {
            return vec![self.error_to(
                player,
                ErrorCode::CommitmentMismatch,
                "public signals do not match the coordinator's state",
            )];
        }

        self.pending_verify.insert(player);
        vec![Effect::Verify(VerifyJob {
            player,
            circuit: CircuitType::GameAction,
            proof,
            public_signals: submitted,
            pending: PendingTransition::GameAction {
                seat,
                action,
                amount,
            },
        })]
    }

    fn apply_game_action(
        &mut self,
        player: PlayerId,
        seat: SeatId,
        action: Action,
        amount: u64,
    ) -> Vec<Effect> {
        let HandPhase::Betting { .. } = self.phase else {
            warn!(target: LOG_TARGET, room = %self.id, %player, "stale action result dropped");
            return Vec::new();
        };
        if self.betting().to_act != seat {
            warn!(target: LOG_TARGET, room = %self.id, %player, "action actor changed, dropped");
            return Vec::new();
        }
        let (transition, applied) = match apply_action(self.betting_mut(), seat, action, amount) {
            Ok(outcome) => outcome,
            Err(err) => {
                return vec![self.error_to(player, ErrorCode::InvalidAction, err.to_string())];
            }
        };
        self.run_transition(player, applied, transition)
    }

    fn run_transition(
        &mut self,
        player: PlayerId,
        applied: AppliedAction,
        transition: Transition,
    ) -> Vec<Effect> {
        let mut effects = vec![Effect::Broadcast {
            message: ServerMessage::ActionResult {
                player_id: player,
                action_type: applied.action.as_u8(),
                amount: applied.chips_in,
                new_pot: applied.new_pot,
                player_stack: applied.remaining_stack,
            },
        }];
        match transition {
            Transition::Continued { .. } => effects.extend(self.player_turn_effects()),
            Transition::StreetEnd => effects.extend(self.handle_street_end()),
            Transition::HandEndByFold { winner } => {
                effects.extend(self.settle_fold_win(winner));
            }
        }
        effects
    }

    fn handle_street_end(&mut self) -> Vec<Effect> {
        let next = match advance_street(self.betting_mut()) {
            Ok(street) => street,
            Err(err) => {
                warn!(target: LOG_TARGET, room = %self.id, error = %err, "street advance failed");
                return self.abort_hand("internal street error");
            }
        };
        if next == Street::Showdown {
            self.begin_showdown()
        } else {
            self.begin_community_unmask(next)
        }
    }

    fn begin_community_unmask(&mut self, street: Street) -> Vec<Effect> {
        // Every mask holder is needed for every community card; if one is
        // gone the hand cannot complete.
        let missing = self
            .mask_holders
            .iter()
            .any(|holder| self.seat_of(holder).is_none());
        if missing {
            return self.abort_hand("a mask holder is no longer available");
        }

        let revealed_so_far: usize = match street {
            Street::Flop => 0,
            Street::Turn => 3,
            Street::River => 4,
            _ => return self.abort_hand("invalid community street"),
        };
        let count = street.cards_revealed();
        let positions: Vec<u8> = self.community_positions
            [revealed_so_far..revealed_so_far + count]
            .to_vec();

        self.phase = HandPhase::UnmaskingCommunity { street };
        let deck: [MaskedCard; DECK_SIZE] = **self.deck.as_ref().expect("deck present");
        let mut effects = Vec::new();
        for position in positions {
            let card = deck[position as usize];
            let tracker = UnmaskTracker::new(
                position,
                CardOwner::Community,
                card,
                self.mask_holders.clone(),
            )
            .expect("card commits");
            if let Some(first) = tracker.next_community_unmasker() {
                effects.push(Effect::Send {
                    to: first,
                    message: ServerMessage::UnmaskRequest {
                        card_index: position,
                        for_player_id: COMMUNITY_OWNER.to_string(),
                        card: WireCard::from(&card),
                    },
                });
            }
            self.trackers.insert(position, tracker);
        }
        effects.push(self.arm_phase_timer());
        effects
    }

    // ------------------------------------------------------------------
    // Showdown
    // ------------------------------------------------------------------

    fn begin_showdown(&mut self) -> Vec<Effect> {
        self.phase = HandPhase::Showdown;
        let pot = self.betting().pot;
        let contenders = self.contenders();
        let mut effects = Vec::new();
        for (_, player) in &contenders {
            let opponents: Vec<PlayerId> = contenders
                .iter()
                .filter(|(_, other)| other != player)
                .map(|(_, other)| *other)
                .collect();
            effects.push(Effect::Send {
                to: *player,
                message: ServerMessage::RevealHandRequest { pot, opponents },
            });
        }
        effects.push(self.arm_phase_timer());
        effects
    }

    pub(super) fn handle_submit_hand_reveal(
        &mut self,
        player: PlayerId,
        hand_rank: u16,
        hand_description: String,
        card_indices: Vec<u8>,
        proof: ProofJson,
        signals: Vec<String>,
    ) -> Vec<Effect> {
        let Some(seat) = self.seat_of(&player) else {
            return vec![self.error_to(player, ErrorCode::NotInRoom, "not seated here")];
        };
        if self.phase != HandPhase::Showdown {
            return vec![self.error_to(player, ErrorCode::InvalidState, "no showdown in progress")];
        }
        if !self.contenders().iter().any(|(s, _)| *s == seat) {
            return vec![self.error_to(player, ErrorCode::InvalidState, "not in this showdown")];
        }
        if self.reveals.contains_key(&seat) {
            return vec![self.error_to(player, ErrorCode::InvalidState, "hand already revealed")];
        }
        if self.pending_verify.contains(&player) {
            return vec![self.error_to(player, ErrorCode::Busy, "verification pending")];
        }

        // The five chosen card values must be distinct, in range, and draw
        // at most two cards from outside the board (the hole cards).
        if card_indices.len() != 5 {
            return vec![self.error_to(player, ErrorCode::InvalidMessage, "five cards required")];
        }
        let mut sorted = card_indices.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != 5 || sorted.iter().any(|&i| i >= 52) {
            return vec![self.error_to(player, ErrorCode::InvalidCard, "bad card selection")];
        }
        let off_board = card_indices
            .iter()
            .filter(|i| !self.board_values.contains(i))
            .count();
        if off_board > 2 {
            return vec![self.error_to(
                player,
                ErrorCode::InvalidCard,
                "selection uses more than two hole cards",
            )];
        }

        let indices5: [u8; 5] = card_indices.clone().try_into().expect("length checked");
        let is_flush = card_indices.iter().all(|i| i / 13 == card_indices[0] / 13);
        let key = crate::ranking::lookup_key(&indices5);
        if tables().rank_of(key, is_flush) != Some(hand_rank) {
            return vec![self.error_to(
                player,
                ErrorCode::InvalidProof,
                "claimed rank does not match the selected cards",
            )];
        }

        let Some(hole_binding) = self.hole_commitments.get(&player).copied() else {
            return vec![self.error_to(player, ErrorCode::InvalidState, "no hole commitment")];
        };
        let board_fields: Vec<BaseField> = self
            .board_values
            .iter()
            .map(|&v| BaseField::from(u64::from(v)))
            .collect();
        let board_commitment = hash_fields(&board_fields).expect("arity 5 hash");
        let root = if is_flush {
            self.rank_roots.flush
        } else {
            self.rank_roots.basic
        };

        let submitted = match parse_signals(&signals) {
            Ok(values) => values,
            Err(detail) => {
                return vec![self.error_to(player, ErrorCode::InvalidProof, detail)];
            }
        };
        let expected = vec![
            root,
            hole_binding,
            board_commitment,
            BaseField::from(u64::from(hand_rank)),
            BaseField::from(u64::from(is_flush)),
        ];
        if submitted != expected {
            return vec![self.error_to(
                player,
                ErrorCode::CommitmentMismatch,
                "public signals do not match the coordinator's commitments",
            )];
        }

        self.pending_verify.insert(player);
        vec![Effect::Verify(VerifyJob {
            player,
            circuit: CircuitType::HandEval,
            proof,
            public_signals: submitted,
            pending: PendingTransition::HandReveal {
                seat,
                rank: hand_rank,
                description: hand_description,
                indices: card_indices,
            },
        })]
    }

    fn apply_hand_reveal(
        &mut self,
        player: PlayerId,
        seat: SeatId,
        rank: u16,
        description: String,
        indices: Vec<u8>,
    ) -> Vec<Effect> {
        if self.phase != HandPhase::Showdown {
            warn!(target: LOG_TARGET, room = %self.id, %player, "stale reveal result dropped");
            return Vec::new();
        }
        self.reveals.insert(
            seat,
            HandReveal {
                rank,
                description: description.clone(),
                indices: indices.clone(),
            },
        );
        let mut effects = vec![Effect::Broadcast {
            message: ServerMessage::HandRevealed {
                player_id: player,
                hand_rank: rank,
                hand_description: description,
                card_indices: indices,
            },
        }];
        if self
            .contenders()
            .iter()
            .all(|(seat, _)| self.reveals.contains_key(seat))
        {
            effects.extend(self.settle_showdown());
        }
        effects
    }

    fn settle_showdown(&mut self) -> Vec<Effect> {
        self.phase = HandPhase::Settling;
        let dealer = self.dealer;
        let table_size = self.config.max_players;

        let ranks: HashMap<SeatId, u16> = self
            .reveals
            .iter()
            .map(|(seat, reveal)| (*seat, reveal.rank))
            .collect();
        let pots = compute_side_pots(&self.betting().seats);
        let payouts = distribute_pots(&pots, &ranks, dealer, table_size);

        let betting = self.betting_mut();
        for (&seat, &chips) in &payouts {
            betting.seat_mut(seat).stack += chips;
        }
        betting.pot = 0;
        betting.status = HandStatus::Finished;

        let players: Vec<ShowdownPlayer> = self
            .contenders()
            .iter()
            .map(|(seat, player)| {
                let reveal = self.reveals.get(seat);
                ShowdownPlayer {
                    player_id: *player,
                    hand_rank: reveal.map(|r| r.rank),
                    hand_description: reveal.map(|r| r.description.clone()),
                }
            })
            .collect();
        let mut winners: Vec<PlayerId> = Vec::new();
        let mut pot_distribution: Vec<PotShare> = Vec::new();
        let mut payout_seats: Vec<SeatId> = payouts.keys().copied().collect();
        payout_seats.sort_unstable();
        for seat in payout_seats {
            if let Some(entry) = self.player_at(seat) {
                winners.push(entry.player);
                pot_distribution.push(PotShare {
                    player_id: entry.player,
                    amount: payouts[&seat],
                });
            }
        }

        let mut effects = vec![Effect::Broadcast {
            message: ServerMessage::Showdown {
                players,
                winners,
                pot_distribution,
            },
        }];
        effects.extend(self.end_hand("showdown"));
        effects
    }

    fn settle_fold_win(&mut self, winner: SeatId) -> Vec<Effect> {
        let betting = self.betting_mut();
        let pot = betting.pot;
        betting.seat_mut(winner).stack += pot;
        betting.pot = 0;
        betting.status = HandStatus::Finished;
        self.end_hand("fold")
    }

    // ------------------------------------------------------------------
    // Hand teardown
    // ------------------------------------------------------------------

    pub(super) fn end_hand(&mut self, reason: &str) -> Vec<Effect> {
        // Write the hand's stacks back into the seats.
        if let Some(betting) = self.betting.take() {
            for entry in &betting.seats {
                let seat = entry.seat;
                if let Some(seat_entry) = self.seats[seat as usize].as_mut() {
                    seat_entry.stack = entry.stack;
                }
            }
        }
        let final_stacks: Vec<StackEntry> = self
            .seats
            .iter()
            .filter_map(|entry| entry.as_ref())
            .map(|entry| StackEntry {
                player_id: entry.player,
                stack: entry.stack,
            })
            .collect();

        // Dealer advances one seat; eliminated stacks are skipped.
        let funded: Vec<(SeatId, u64)> = self
            .seats
            .iter()
            .enumerate()
            .filter_map(|(seat, entry)| match entry {
                Some(e) if e.stack > 0 => Some((seat as SeatId, e.stack)),
                _ => None,
            })
            .collect();
        if let Some(next_dealer) = next_seat_in(&funded, self.dealer) {
            self.dealer = next_dealer;
        }

        self.phase = HandPhase::Waiting;
        self.deck = None;
        self.shuffle_queue.clear();
        self.shuffles_done = 0;
        self.mask_holders.clear();
        self.trackers.clear();
        self.hole_positions.clear();
        self.hole_commitments.clear();
        self.community_positions.clear();
        self.board_values.clear();
        self.reveals.clear();
        self.pending_verify.clear();
        self.next_turn_epoch();
        self.next_phase_epoch();
        for entry in self.seats.iter_mut().filter_map(|s| s.as_mut()) {
            entry.ready = false;
            entry.strikes = 0;
        }

        info!(target: LOG_TARGET, room = %self.id, reason, "hand ended");
        vec![Effect::Broadcast {
            message: ServerMessage::GameEnded {
                reason: reason.to_string(),
                final_stacks,
            },
        }]
    }

    /// Unwinds an unfinishable hand: every contribution goes back to its
    /// seat, then the hand ends.
    pub(super) fn abort_hand(&mut self, reason: &str) -> Vec<Effect> {
        warn!(target: LOG_TARGET, room = %self.id, reason, "hand aborted");
        if let Some(betting) = self.betting.as_mut() {
            for entry in betting.seats.iter_mut() {
                entry.stack += entry.total_bet;
                entry.total_bet = 0;
                entry.street_bet = 0;
            }
            betting.pot = 0;
            betting.status = HandStatus::Finished;
        }
        self.end_hand("abort")
    }

    // ------------------------------------------------------------------
    // Verification results
    // ------------------------------------------------------------------

    pub(super) fn handle_verify_result(
        &mut self,
        player: PlayerId,
        pending: PendingTransition,
        result: Result<(), VerifyError>,
    ) -> Vec<Effect> {
        self.pending_verify.remove(&player);
        // Liveness gate: the submitter may have forfeited while the proof
        // was in flight.
        if self.seat_of(&player).is_none() {
            return Vec::new();
        }

        match result {
            Ok(()) => match pending {
                PendingTransition::Shuffle {
                    seat,
                    deck,
                    commitment,
                } => self.apply_shuffle(player, seat, deck, commitment),
                PendingTransition::Unmask { card_index, card } => {
                    self.apply_unmask(player, card_index, card)
                }
                PendingTransition::GameAction {
                    seat,
                    action,
                    amount,
                } => self.apply_game_action(player, seat, action, amount),
                PendingTransition::HandReveal {
                    seat,
                    rank,
                    description,
                    indices,
                } => self.apply_hand_reveal(player, seat, rank, description, indices),
            },
            Err(err) => {
                let mut effects =
                    vec![self.error_to(player, ErrorCode::InvalidProof, err.to_string())];
                let strikes = {
                    let entry = self.entry_mut(&player).expect("seated");
                    entry.strikes += 1;
                    entry.strikes
                };
                warn!(
                    target: LOG_TARGET,
                    room = %self.id,
                    %player,
                    strikes,
                    error = %err,
                    "proof rejected"
                );
                if strikes >= CRYPTO_STRIKE_LIMIT {
                    effects.extend(self.forfeit_player(player, "repeated invalid proofs"));
                }
                effects
            }
        }
    }

    // ------------------------------------------------------------------
    // Timeouts and forfeits
    // ------------------------------------------------------------------

    pub(super) fn handle_turn_timeout(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.turn_epoch {
            return Vec::new();
        }
        let HandPhase::Betting { .. } = self.phase else {
            return Vec::new();
        };
        let seat = self.betting().to_act;
        let Some(entry) = self.player_at(seat) else {
            return Vec::new();
        };
        let player = entry.player;
        info!(target: LOG_TARGET, room = %self.id, %player, seat, "turn timeout, auto-fold");
        match apply_action(self.betting_mut(), seat, Action::Fold, 0) {
            Ok((transition, applied)) => self.run_transition(player, applied, transition),
            Err(err) => {
                warn!(target: LOG_TARGET, room = %self.id, error = %err, "auto-fold failed");
                Vec::new()
            }
        }
    }

    pub(super) fn handle_phase_timeout(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.phase_epoch {
            return Vec::new();
        }
        match self.phase {
            HandPhase::Shuffling { turn } => {
                let Some(entry) = self.player_at(turn) else {
                    return Vec::new();
                };
                let player = entry.player;
                info!(target: LOG_TARGET, room = %self.id, %player, "shuffle timeout, forfeit");
                self.forfeit_player(player, "missed shuffle turn")
            }
            HandPhase::UnmaskingHole | HandPhase::UnmaskingCommunity { .. } => {
                // The laggards hold mask layers the hand cannot proceed
                // without; fold them and unwind.
                let mut laggards: Vec<PlayerId> = self
                    .trackers
                    .values()
                    .flat_map(|tracker| {
                        self.mask_holders
                            .iter()
                            .filter(|holder| tracker.is_pending_for(holder))
                            .copied()
                            .collect::<Vec<_>>()
                    })
                    .collect();
                laggards.sort_unstable();
                laggards.dedup();
                let mut effects = Vec::new();
                for player in laggards {
                    effects.extend(self.forfeit_player(player, "missed unmask deadline"));
                    if self.phase == HandPhase::Waiting {
                        break; // hand already unwound
                    }
                }
                effects
            }
            HandPhase::Showdown => {
                let missing: Vec<(SeatId, PlayerId)> = self
                    .contenders()
                    .into_iter()
                    .filter(|(seat, _)| !self.reveals.contains_key(seat))
                    .collect();
                let mut effects = Vec::new();
                for (seat, player) in missing {
                    info!(
                        target: LOG_TARGET,
                        room = %self.id,
                        %player,
                        "showdown reveal missed, pot forfeited"
                    );
                    self.betting_mut().seat_mut(seat).status = PlayerStatus::Folded;
                }
                if self.reveals.is_empty() {
                    effects.extend(self.abort_hand("no showdown reveals"));
                } else {
                    effects.extend(self.settle_showdown());
                }
                effects
            }
            _ => Vec::new(),
        }
    }

    /// Takes a player out of the current hand: fold them, and if their mask
    /// layers are still needed for unrevealed cards, unwind the hand.
    pub(super) fn forfeit_player(&mut self, player: PlayerId, reason: &str) -> Vec<Effect> {
        let Some(seat) = self.seat_of(&player) else {
            return Vec::new();
        };
        if self.betting.is_none() || !self.phase.in_hand() {
            return Vec::new();
        }
        info!(target: LOG_TARGET, room = %self.id, %player, seat, reason, "player forfeits hand");

        let in_hand = self.betting().has_seat(seat);
        if in_hand {
            let entry = self.betting_mut().seat_mut(seat);
            if !matches!(entry.status, PlayerStatus::Folded | PlayerStatus::SittingOut) {
                entry.status = PlayerStatus::Folded;
            }
        }

        // Collapse to one player ends the hand in their favor.
        let non_folded = self.betting().non_folded_seats();
        if non_folded.len() == 1 {
            return self.settle_fold_win(non_folded[0]);
        }
        if non_folded.is_empty() {
            return self.abort_hand("all players forfeited");
        }

        // Mask layers still on unrevealed cards make the hand unfinishable.
        let holds_needed_masks =
            self.mask_holders.contains(&player) && self.board_values.len() < 5;
        if holds_needed_masks {
            return self.abort_hand("a mask holder left the hand");
        }

        match self.phase {
            HandPhase::Shuffling { turn } => {
                self.shuffle_queue.retain(|&s| s != seat);
                if turn == seat {
                    if self.shuffle_queue.is_empty() {
                        self.deal()
                    } else {
                        self.shuffle_turn_effects()
                    }
                } else {
                    Vec::new()
                }
            }
            HandPhase::Betting { .. } => {
                if self.betting().to_act == seat {
                    if self.betting().street_settled() {
                        self.handle_street_end()
                    } else if let Some(next) = self.betting().next_active_after(seat) {
                        self.betting_mut().to_act = next;
                        self.player_turn_effects()
                    } else {
                        self.handle_street_end()
                    }
                } else {
                    Vec::new()
                }
            }
            HandPhase::Showdown => {
                if self
                    .contenders()
                    .iter()
                    .all(|(seat, _)| self.reveals.contains_key(seat))
                {
                    self.settle_showdown()
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Seats dealt into the current hand, with their players, seat order.
    fn hand_participants(&self) -> Vec<(SeatId, PlayerId)> {
        let betting = self.betting();
        betting
            .seats
            .iter()
            .filter(|entry| !matches!(entry.status, PlayerStatus::Folded | PlayerStatus::SittingOut))
            .filter_map(|entry| {
                self.player_at(entry.seat)
                    .map(|seat_entry| (entry.seat, seat_entry.player))
            })
            .collect()
    }

    /// Non-folded seats still contesting the pot.
    fn contenders(&self) -> Vec<(SeatId, PlayerId)> {
        let betting = self.betting();
        betting
            .non_folded_seats()
            .into_iter()
            .filter_map(|seat| self.player_at(seat).map(|entry| (seat, entry.player)))
            .collect()
    }
}

fn parse_signals(signals: &[String]) -> Result<Vec<BaseField>, String> {
    signals.iter().map(|s| parse_field(s)).collect()
}

/// Next seat clockwise within an eligible list, exclusive of `from`.
fn next_seat_in(eligible: &[(SeatId, u64)], from: SeatId) -> Option<SeatId> {
    if eligible.is_empty() {
        return None;
    }
    eligible
        .iter()
        .map(|(seat, _)| *seat)
        .filter(|&seat| seat > from)
        .min()
        .or_else(|| eligible.iter().map(|(seat, _)| *seat).min())
}
