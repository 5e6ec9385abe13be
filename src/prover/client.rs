//! The player automaton: reacts to coordinator messages, runs the masking
//! algebra with its own secret, and drives the proving backend.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::OsRng;
use tracing::{debug, warn};

use crate::cards::{card_index_of_point, MaskedCard, DECK_SIZE};
use crate::crypto::curve::random_scalar;
use crate::crypto::{CurvePoint, ScalarField};
use crate::engine::{apply_action, Action, BettingState, Chips, SeatId, Stakes};
use crate::game::GameSnapshot;
use crate::proofs::CircuitType;
use crate::protocol::codec::WireCard;
use crate::protocol::{ClientMessage, GameStateWire, PlayerId, RoomId, ServerMessage};

use super::witness::{prepare_hand_eval, prepare_shuffle, prepare_unmask, WitnessBundle};
use super::{GameActionWitness, ProverBackend, ProverError};

const LOG_TARGET: &str = "prover::client";

/// Betting decision surface handed to a [`Strategy`].
#[derive(Clone, Debug)]
pub struct TurnInfo {
    pub valid_actions: Vec<Action>,
    pub amount_to_call: Chips,
    pub min_bet: Chips,
    pub min_raise_to: Chips,
    pub stack: Chips,
}

pub trait Strategy: Send {
    fn decide(&mut self, info: &TurnInfo) -> (Action, Chips);
}

/// Checks when free, calls when priced: the simplest live strategy.
pub struct CheckCallStrategy;

impl Strategy for CheckCallStrategy {
    fn decide(&mut self, info: &TurnInfo) -> (Action, Chips) {
        if info.valid_actions.contains(&Action::Check) {
            (Action::Check, 0)
        } else if info.valid_actions.contains(&Action::Call) {
            (Action::Call, 0)
        } else {
            (Action::Fold, 0)
        }
    }
}

pub struct PlayerClient {
    pub player_id: Option<PlayerId>,
    pub room_id: Option<RoomId>,
    pub seat: Option<SeatId>,
    secret: ScalarField,
    pub public_key: CurvePoint,
    name: String,
    backend: Arc<dyn ProverBackend>,
    strategy: Box<dyn Strategy>,

    stakes: Stakes,
    seat_of_player: HashMap<PlayerId, SeatId>,
    /// Replica of the coordinator's betting state, advanced by broadcasts.
    replica: Option<BettingState>,
    hole_positions: Vec<u8>,
    hole_values: Vec<u8>,
    board_values: Vec<u8>,
    hole_card_commitments: Vec<crate::crypto::BaseField>,
}

impl PlayerClient {
    pub fn new(name: impl Into<String>, backend: Arc<dyn ProverBackend>) -> Self {
        let secret = random_scalar(&mut OsRng);
        Self::with_secret(name, secret, backend)
    }

    pub fn with_secret(
        name: impl Into<String>,
        secret: ScalarField,
        backend: Arc<dyn ProverBackend>,
    ) -> Self {
        Self {
            player_id: None,
            room_id: None,
            seat: None,
            public_key: CurvePoint::mul_generator(&secret),
            secret,
            name: name.into(),
            backend,
            strategy: Box::new(CheckCallStrategy),
            stakes: Stakes {
                small_blind: 1,
                big_blind: 2,
            },
            seat_of_player: HashMap::new(),
            replica: None,
            hole_positions: Vec::new(),
            hole_values: Vec::new(),
            board_values: Vec::new(),
            hole_card_commitments: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn hole_values(&self) -> &[u8] {
        &self.hole_values
    }

    pub fn join_message(&self, room_id: Option<RoomId>) -> ClientMessage {
        ClientMessage::JoinRoom {
            room_id,
            player_name: self.name.clone(),
            public_key_x: self.public_key.x.to_string(),
            public_key_y: self.public_key.y.to_string(),
        }
    }

    /// Reacts to one coordinator message, producing any submissions it
    /// requires. Proving runs through the backend and may take a while.
    pub async fn handle(
        &mut self,
        message: &ServerMessage,
    ) -> Result<Vec<ClientMessage>, ProverError> {
        match message {
            ServerMessage::Connected { player_id } => {
                self.player_id = Some(*player_id);
                Ok(Vec::new())
            }
            ServerMessage::RoomJoined {
                room_id,
                player_id,
                seat_index,
                players,
                config,
            } => {
                self.room_id = Some(*room_id);
                self.player_id = Some(*player_id);
                self.seat = Some(*seat_index);
                self.stakes = Stakes {
                    small_blind: config.small_blind,
                    big_blind: config.big_blind,
                };
                for info in players {
                    self.seat_of_player.insert(info.player_id, info.seat_index);
                }
                Ok(Vec::new())
            }
            ServerMessage::PlayerJoined {
                player_id,
                seat_index,
                ..
            } => {
                self.seat_of_player.insert(*player_id, *seat_index);
                Ok(Vec::new())
            }
            ServerMessage::PlayerLeft { player_id, .. } => {
                self.seat_of_player.remove(player_id);
                Ok(Vec::new())
            }
            ServerMessage::GameStarted { game_state } => {
                self.start_hand(game_state);
                Ok(Vec::new())
            }
            ServerMessage::ShuffleTurn {
                player_id,
                current_deck,
                ..
            } if Some(*player_id) == self.player_id => self.shuffle(current_deck).await,
            ServerMessage::CardsDealt { your_cards } => {
                self.hole_positions = your_cards.clone();
                Ok(Vec::new())
            }
            ServerMessage::UnmaskRequest {
                card_index, card, ..
            } => self.unmask(*card_index, card).await,
            ServerMessage::CardFullyUnmasked {
                card, is_community, ..
            } => {
                self.absorb_revealed_card(card, is_community.unwrap_or(false));
                Ok(Vec::new())
            }
            ServerMessage::ActionResult {
                player_id,
                action_type,
                amount,
                ..
            } => {
                self.replay_action(player_id, *action_type, *amount);
                Ok(Vec::new())
            }
            ServerMessage::PlayerTurn {
                player_id,
                valid_actions,
                min_bet,
                min_raise,
                amount_to_call,
                ..
            } if Some(*player_id) == self.player_id => {
                self.act(valid_actions, *min_bet, *min_raise, *amount_to_call)
                    .await
            }
            ServerMessage::RevealHandRequest { .. } => self.reveal().await,
            ServerMessage::GameEnded { .. } => {
                self.replica = None;
                self.hole_positions.clear();
                self.hole_values.clear();
                self.board_values.clear();
                self.hole_card_commitments.clear();
                Ok(Vec::new())
            }
            _ => Ok(Vec::new()),
        }
    }

    fn start_hand(&mut self, state: &GameStateWire) {
        // Rebuild the hand's opening state from the broadcast: stacks are
        // post-blind, so the pre-blind entries put the street bets back.
        let mut seats: Vec<SeatId> = self.seat_of_player.values().copied().collect();
        seats.sort_unstable();
        if seats.len() < state.stacks.len() || state.stacks.len() != state.street_bets.len() {
            warn!(target: LOG_TARGET, "game state does not match the known seating");
            return;
        }
        let entries: Vec<(SeatId, Chips)> = state
            .stacks
            .iter()
            .zip(state.street_bets.iter())
            .enumerate()
            .map(|(i, (stack, bet))| (seats[i], stack + bet))
            .collect();
        match BettingState::new_hand(self.stakes, state.dealer, entries) {
            Ok(replica) => self.replica = Some(replica),
            Err(err) => {
                warn!(target: LOG_TARGET, error = %err, "replica construction failed");
            }
        }
    }

    async fn shuffle(&mut self, deck_wire: &[WireCard]) -> Result<Vec<ClientMessage>, ProverError> {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for wire in deck_wire {
            cards.push(
                wire.decode()
                    .map_err(|detail| ProverError::Witness(detail))?,
            );
        }
        let deck: [MaskedCard; DECK_SIZE] = cards
            .try_into()
            .map_err(|_| ProverError::Witness("deck must have 52 cards".into()))?;

        // First shuffler sees a bare deck; later ones re-shuffle a fully
        // masked one.
        let circuit = if deck[0].pk.is_identity() {
            CircuitType::Shuffle
        } else {
            CircuitType::Reshuffle
        };
        let witness = prepare_shuffle(&deck, &self.secret, &mut OsRng)?;
        let deck_commitment = witness.commitment_after.to_string();
        let shuffled_deck: Vec<WireCard> = witness.deck_after.iter().map(WireCard::from).collect();
        let bundle = WitnessBundle::Shuffle(witness);
        let proved = self.backend.prove(circuit, &bundle).await?;
        debug!(target: LOG_TARGET, circuit = circuit.as_str(), "shuffle proof ready");
        Ok(vec![ClientMessage::SubmitShuffle {
            shuffled_deck,
            deck_commitment,
            proof: proved.proof,
            public_signals: proved.public_signals,
        }])
    }

    async fn unmask(
        &mut self,
        card_index: u8,
        card_wire: &WireCard,
    ) -> Result<Vec<ClientMessage>, ProverError> {
        let card = card_wire
            .decode()
            .map_err(|detail| ProverError::Witness(detail))?;
        let witness = prepare_unmask(&card, &self.secret)?;
        let unmasked_card = WireCard::from(&witness.card_after);
        let bundle = WitnessBundle::Unmask(witness);
        let proved = self.backend.prove(CircuitType::Unmask, &bundle).await?;
        Ok(vec![ClientMessage::SubmitUnmask {
            card_index,
            unmasked_card,
            proof: proved.proof,
            public_signals: proved.public_signals,
        }])
    }

    fn absorb_revealed_card(&mut self, card_wire: &WireCard, is_community: bool) {
        let Ok(card) = card_wire.decode() else {
            warn!(target: LOG_TARGET, "revealed card failed to decode");
            return;
        };
        if is_community {
            if let Some(value) = card_index_of_point(&card.msg) {
                if !self.board_values.contains(&value) {
                    self.board_values.push(value);
                }
            }
            return;
        }
        // Our hole card still carries our own layer; peel it locally and
        // remember the delivered state for the showdown binding.
        if let Ok(commitment) = card.commitment() {
            self.hole_card_commitments.push(commitment);
        }
        match card.partial_unmask(&self.secret) {
            Ok(open) => match card_index_of_point(&open.msg) {
                Some(value) => self.hole_values.push(value),
                None => warn!(target: LOG_TARGET, "hole card decodes to no value"),
            },
            Err(err) => warn!(target: LOG_TARGET, error = %err, "hole card unmask failed"),
        }
    }

    fn replay_action(&mut self, player: &PlayerId, action_type: u8, chips_in: u64) {
        let Some(replica) = self.replica.as_mut() else {
            return;
        };
        let Some(&seat) = self.seat_of_player.get(player) else {
            return;
        };
        let Some(action) = Action::from_u8(action_type) else {
            return;
        };
        // `chips_in` is the delta; bets and raises are expressed to the
        // engine as the resulting street total.
        let amount = match action {
            Action::Bet | Action::Raise => replica.seat(seat).street_bet + chips_in,
            _ => 0,
        };
        match apply_action(replica, seat, action, amount) {
            Ok((transition, _)) => {
                if matches!(transition, crate::engine::Transition::StreetEnd) {
                    let _ = crate::engine::advance_street(replica);
                }
            }
            Err(err) => {
                warn!(target: LOG_TARGET, error = %err, "replica diverged from coordinator");
            }
        }
    }

    async fn act(
        &mut self,
        valid_codepoints: &[u8],
        min_bet: Chips,
        min_raise_to: Chips,
        amount_to_call: Chips,
    ) -> Result<Vec<ClientMessage>, ProverError> {
        let (Some(seat), Some(replica)) = (self.seat, self.replica.as_ref()) else {
            return Ok(Vec::new());
        };
        let info = TurnInfo {
            valid_actions: valid_codepoints
                .iter()
                .filter_map(|&c| Action::from_u8(c))
                .collect(),
            amount_to_call,
            min_bet,
            min_raise_to,
            stack: replica.seat(seat).stack,
        };
        let (action, amount) = self.strategy.decide(&info);

        let snapshot_before = GameSnapshot::of(replica);
        let mut probe = replica.clone();
        apply_action(&mut probe, seat, action, amount)
            .map_err(|err| ProverError::Witness(err.to_string()))?;
        let snapshot_after = GameSnapshot::of(&probe);
        let commitment_before = snapshot_before.commitment()?;
        let commitment_after = snapshot_after.commitment()?;

        let witness = GameActionWitness {
            snapshot_before,
            snapshot_after,
            commitment_before,
            commitment_after,
            action: action.as_u8(),
            amount,
            current_player: u64::from(seat) + 1,
        };
        let state_commitment = commitment_after.to_string();
        let bundle = WitnessBundle::GameAction(witness);
        let proved = self.backend.prove(CircuitType::GameAction, &bundle).await?;
        Ok(vec![ClientMessage::SubmitAction {
            action_type: action.as_u8(),
            amount,
            state_commitment,
            proof: proved.proof,
            public_signals: proved.public_signals,
        }])
    }

    async fn reveal(&mut self) -> Result<Vec<ClientMessage>, ProverError> {
        if self.hole_values.len() != 2 || self.board_values.len() != 5 {
            return Err(ProverError::Witness(
                "cannot reveal before hole and board are known".into(),
            ));
        }
        let hole = [self.hole_values[0], self.hole_values[1]];
        let board: [u8; 5] = self.board_values.clone().try_into().expect("five cards");
        let hole_commitment = crate::crypto::hash_fields(&self.hole_card_commitments)
            .map_err(ProverError::from)?;
        let witness = prepare_hand_eval(hole, board, hole_commitment)?;
        let hand_rank = witness.rank;
        let description = best_description(&witness.chosen, witness.is_flush);
        let card_indices = witness.chosen.to_vec();
        let bundle = WitnessBundle::HandEval(witness);
        let proved = self.backend.prove(CircuitType::HandEval, &bundle).await?;
        Ok(vec![ClientMessage::SubmitHandReveal {
            hand_rank,
            hand_description: description,
            card_indices,
            proof: proved.proof,
            public_signals: proved.public_signals,
        }])
    }
}

fn best_description(chosen: &[u8; 5], is_flush: bool) -> String {
    let ranks: [u8; 5] = chosen.map(|i| i % 13 + 2);
    let (category, _) = crate::ranking::classify_ranks(ranks, is_flush);
    category.describe().to_string()
}
