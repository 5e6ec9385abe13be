//! Room state: seat registry, configuration, and the event dispatcher.
//!
//! A room is a single-logical-thread state machine. The hosting actor feeds
//! it one [`RoomEvent`] at a time and performs the returned effects; all
//! hand-flow handlers live in `hand.rs`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::cards::MaskedCard;
use crate::crypto::{BaseField, CurvePoint};
use crate::engine::{BettingState, Chips, SeatId, Stakes};
use crate::protocol::{
    ClientMessage, ErrorCode, PlayerId, PlayerInfo, RoomConfigWire, RoomId, ServerMessage,
};

use super::events::{Effect, RoomEvent};
use super::phases::HandPhase;
use super::unmask::UnmaskTracker;

pub(crate) const LOG_TARGET: &str = "game::room";

/// How many rejected proofs a player gets within one hand before forfeit.
pub const CRYPTO_STRIKE_LIMIT: u8 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomConfig {
    pub min_players: u8,
    pub max_players: u8,
    pub stakes: Stakes,
    pub starting_stack: Chips,
    pub turn_timeout: Duration,
    pub phase_timeout: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 10,
            stakes: Stakes {
                small_blind: 1,
                big_blind: 2,
            },
            starting_stack: 100,
            turn_timeout: Duration::from_secs(60),
            phase_timeout: Duration::from_secs(30),
        }
    }
}

impl RoomConfig {
    pub fn to_wire(&self) -> RoomConfigWire {
        RoomConfigWire {
            min_players: self.min_players,
            max_players: self.max_players,
            small_blind: self.stakes.small_blind,
            big_blind: self.stakes.big_blind,
            starting_stack: self.starting_stack,
            turn_timeout_ms: self.turn_timeout.as_millis() as u64,
        }
    }
}

/// The two pinned Merkle roots the hand-eval circuit proves against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankRoots {
    pub basic: BaseField,
    pub flush: BaseField,
}

#[derive(Clone, Debug)]
pub struct SeatEntry {
    pub player: PlayerId,
    pub name: String,
    pub public_key: CurvePoint,
    pub ready: bool,
    pub connected: bool,
    pub stack: Chips,
    pub strikes: u8,
}

#[derive(Clone, Debug)]
pub struct HandReveal {
    pub rank: u16,
    pub description: String,
    pub indices: Vec<u8>,
}

pub struct Room {
    pub id: RoomId,
    pub config: RoomConfig,
    pub(super) rank_roots: RankRoots,

    pub(super) seats: Vec<Option<SeatEntry>>,
    pub(super) dealer: SeatId,
    pub(super) phase: HandPhase,

    pub(super) betting: Option<BettingState>,
    pub(super) deck: Option<Box<[MaskedCard; 52]>>,
    pub(super) deck_commitment: BaseField,
    pub(super) shuffle_queue: Vec<SeatId>,
    pub(super) shuffles_done: usize,
    /// Players whose mask layers sit on the deck, seat order.
    pub(super) mask_holders: Vec<PlayerId>,

    pub(super) trackers: HashMap<u8, UnmaskTracker>,
    pub(super) hole_positions: HashMap<PlayerId, [u8; 2]>,
    pub(super) hole_commitments: HashMap<PlayerId, BaseField>,
    pub(super) community_positions: Vec<u8>,
    /// Revealed board card values (0..52), reveal order.
    pub(super) board_values: Vec<u8>,
    pub(super) reveals: HashMap<SeatId, HandReveal>,

    pub(super) pending_verify: HashSet<PlayerId>,
    pub(super) turn_epoch: u64,
    pub(super) phase_epoch: u64,
    pub(super) hand_no: u64,
}

impl Room {
    pub fn new(id: RoomId, config: RoomConfig, rank_roots: RankRoots) -> Self {
        let seat_count = config.max_players as usize;
        Self {
            id,
            config,
            rank_roots,
            seats: vec![None; seat_count],
            dealer: 0,
            phase: HandPhase::Waiting,
            betting: None,
            deck: None,
            deck_commitment: BaseField::from(0u64),
            shuffle_queue: Vec::new(),
            shuffles_done: 0,
            mask_holders: Vec::new(),
            trackers: HashMap::new(),
            hole_positions: HashMap::new(),
            hole_commitments: HashMap::new(),
            community_positions: Vec::new(),
            board_values: Vec::new(),
            reveals: HashMap::new(),
            pending_verify: HashSet::new(),
            turn_epoch: 0,
            phase_epoch: 0,
            hand_no: 0,
        }
    }

    pub fn phase(&self) -> HandPhase {
        self.phase
    }

    pub fn is_empty(&self) -> bool {
        self.seats.iter().all(|s| s.is_none())
    }

    pub fn seat_of(&self, player: &PlayerId) -> Option<SeatId> {
        self.seats.iter().position(|entry| {
            entry
                .as_ref()
                .map(|e| e.player == *player)
                .unwrap_or(false)
        }).map(|i| i as SeatId)
    }

    pub fn player_at(&self, seat: SeatId) -> Option<&SeatEntry> {
        self.seats.get(seat as usize)?.as_ref()
    }

    /// Every seated player, for broadcast fan-out.
    pub fn players(&self) -> Vec<PlayerId> {
        self.seats
            .iter()
            .filter_map(|entry| entry.as_ref().map(|e| e.player))
            .collect()
    }

    pub(super) fn entry_mut(&mut self, player: &PlayerId) -> Option<&mut SeatEntry> {
        self.seats
            .iter_mut()
            .filter_map(|s| s.as_mut())
            .find(|e| e.player == *player)
    }

    pub(super) fn player_infos(&self) -> Vec<PlayerInfo> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(seat, entry)| {
                entry.as_ref().map(|e| PlayerInfo {
                    player_id: e.player,
                    seat_index: seat as u8,
                    player_name: e.name.clone(),
                    is_ready: e.ready,
                    is_connected: e.connected,
                })
            })
            .collect()
    }

    /// Seats eligible for the next hand: connected, funded players.
    pub(super) fn eligible_seats(&self) -> Vec<(SeatId, Chips)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(seat, entry)| match entry {
                Some(e) if e.connected && e.stack > 0 => Some((seat as SeatId, e.stack)),
                _ => None,
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Event dispatch
    // ------------------------------------------------------------------

    pub fn handle(&mut self, event: RoomEvent) -> Vec<Effect> {
        match event {
            RoomEvent::Client { player, message } => self.handle_client(player, message),
            RoomEvent::VerifyResult {
                player,
                pending,
                result,
            } => self.handle_verify_result(player, pending, result),
            RoomEvent::TurnTimeout { epoch } => self.handle_turn_timeout(epoch),
            RoomEvent::PhaseTimeout { epoch } => self.handle_phase_timeout(epoch),
            RoomEvent::Disconnected { player } => self.handle_disconnect(player),
        }
    }

    fn handle_client(&mut self, player: PlayerId, message: ClientMessage) -> Vec<Effect> {
        match message {
            ClientMessage::JoinRoom {
                player_name,
                public_key_x,
                public_key_y,
                ..
            } => self.handle_join(player, player_name, &public_key_x, &public_key_y),
            ClientMessage::LeaveRoom {} => self.handle_leave(player),
            ClientMessage::Ready { is_ready } => self.handle_ready(player, is_ready),
            ClientMessage::SubmitShuffle {
                shuffled_deck,
                deck_commitment,
                proof,
                public_signals,
            } => self.handle_submit_shuffle(
                player,
                shuffled_deck,
                &deck_commitment,
                proof,
                public_signals,
            ),
            ClientMessage::SubmitUnmask {
                card_index,
                unmasked_card,
                proof,
                public_signals,
            } => self.handle_submit_unmask(player, card_index, unmasked_card, proof, public_signals),
            ClientMessage::SubmitAction {
                action_type,
                amount,
                state_commitment,
                proof,
                public_signals,
            } => self.handle_submit_action(
                player,
                action_type,
                amount,
                &state_commitment,
                proof,
                public_signals,
            ),
            ClientMessage::SubmitHandReveal {
                hand_rank,
                hand_description,
                card_indices,
                proof,
                public_signals,
            } => self.handle_submit_hand_reveal(
                player,
                hand_rank,
                hand_description,
                card_indices,
                proof,
                public_signals,
            ),
        }
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    fn handle_join(
        &mut self,
        player: PlayerId,
        name: String,
        public_key_x: &str,
        public_key_y: &str,
    ) -> Vec<Effect> {
        if self.seat_of(&player).is_some() {
            return vec![self.error_to(player, ErrorCode::InvalidState, "already seated")];
        }
        let public_key = match parse_public_key(public_key_x, public_key_y) {
            Ok(pk) => pk,
            Err(detail) => {
                return vec![self.error_to(player, ErrorCode::InvalidMessage, detail)];
            }
        };
        let Some(seat) = self.seats.iter().position(|s| s.is_none()) else {
            return vec![self.error_to(player, ErrorCode::RoomFull, "no free seat")];
        };

        self.seats[seat] = Some(SeatEntry {
            player,
            name: name.clone(),
            public_key,
            ready: false,
            connected: true,
            stack: self.config.starting_stack,
            strikes: 0,
        });
        info!(
            target: LOG_TARGET,
            room = %self.id,
            %player,
            seat,
            "player joined"
        );

        vec![
            Effect::Send {
                to: player,
                message: ServerMessage::RoomJoined {
                    room_id: self.id,
                    player_id: player,
                    seat_index: seat as u8,
                    players: self.player_infos(),
                    config: self.config.to_wire(),
                },
            },
            Effect::BroadcastExcept {
                except: player,
                message: ServerMessage::PlayerJoined {
                    player_id: player,
                    seat_index: seat as u8,
                    player_name: name,
                },
            },
        ]
    }

    fn handle_leave(&mut self, player: PlayerId) -> Vec<Effect> {
        let Some(seat) = self.seat_of(&player) else {
            return vec![self.error_to(player, ErrorCode::NotInRoom, "not seated here")];
        };

        let mut effects = Vec::new();
        if self.phase.in_hand() {
            effects.extend(self.forfeit_player(player, "left the table"));
        }
        self.seats[seat as usize] = None;
        effects.push(Effect::Broadcast {
            message: ServerMessage::PlayerLeft {
                player_id: player,
                seat_index: seat,
            },
        });
        if self.is_empty() {
            effects.push(Effect::DestroyRoom);
        } else if self.phase == HandPhase::Waiting {
            // The departure may leave everyone remaining ready.
            effects.extend(self.try_start_hand());
        }
        effects
    }

    fn handle_ready(&mut self, player: PlayerId, is_ready: bool) -> Vec<Effect> {
        if self.seat_of(&player).is_none() {
            return vec![self.error_to(player, ErrorCode::NotInRoom, "not seated here")];
        }
        if self.phase.in_hand() {
            return vec![self.error_to(player, ErrorCode::InvalidState, "hand in progress")];
        }
        if let Some(entry) = self.entry_mut(&player) {
            entry.ready = is_ready;
        }
        let mut effects = vec![Effect::Broadcast {
            message: ServerMessage::PlayerReady {
                player_id: player,
                is_ready,
            },
        }];
        effects.extend(self.try_start_hand());
        effects
    }

    fn handle_disconnect(&mut self, player: PlayerId) -> Vec<Effect> {
        if self.seat_of(&player).is_none() {
            return Vec::new();
        }
        warn!(
            target: LOG_TARGET,
            room = %self.id,
            %player,
            "player disconnected"
        );
        // A disconnect forfeits the hand and frees the seat; mid-hand
        // reconnection is not supported.
        self.handle_leave(player)
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    pub(super) fn error_to(
        &self,
        player: PlayerId,
        code: ErrorCode,
        detail: impl Into<String>,
    ) -> Effect {
        Effect::Send {
            to: player,
            message: code.message(detail),
        }
    }

    pub(super) fn betting(&self) -> &BettingState {
        self.betting.as_ref().expect("hand in progress")
    }

    pub(super) fn betting_mut(&mut self) -> &mut BettingState {
        self.betting.as_mut().expect("hand in progress")
    }

    pub(super) fn next_turn_epoch(&mut self) -> u64 {
        self.turn_epoch += 1;
        self.turn_epoch
    }

    pub(super) fn next_phase_epoch(&mut self) -> u64 {
        self.phase_epoch += 1;
        self.phase_epoch
    }

    pub(super) fn arm_turn_timer(&mut self) -> Effect {
        let epoch = self.next_turn_epoch();
        Effect::ArmTurnTimer {
            epoch,
            duration: self.config.turn_timeout,
        }
    }

    pub(super) fn arm_phase_timer(&mut self) -> Effect {
        let epoch = self.next_phase_epoch();
        Effect::ArmPhaseTimer {
            epoch,
            duration: self.config.phase_timeout,
        }
    }
}

fn parse_public_key(x: &str, y: &str) -> Result<CurvePoint, String> {
    let x = crate::protocol::codec::parse_field(x)?;
    let y = crate::protocol::codec::parse_field(y)?;
    let point = CurvePoint::new(x, y).map_err(|err| err.to_string())?;
    if point.is_identity() {
        return Err("public key must not be the identity".into());
    }
    Ok(point)
}

/// Creates a room id.
pub fn new_room_id() -> RoomId {
    Uuid::new_v4()
}
