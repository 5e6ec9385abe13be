//! Room inbound events and outbound effects.
//!
//! The room is a pure state machine: it receives one event at a time and
//! returns the effects the hosting actor should perform (sends, timer arms,
//! proof verifications). Verification results re-enter as events, carrying
//! the pending transition they gate.

use std::time::Duration;

use crate::cards::MaskedCard;
use crate::crypto::BaseField;
use crate::engine::{Action, Chips, SeatId};
use crate::proofs::{CircuitType, ProofJson, VerifyError};
use crate::protocol::{ClientMessage, PlayerId, ServerMessage};

/// A proof-gated transition waiting on the verification pool.
#[derive(Clone, Debug)]
pub enum PendingTransition {
    Shuffle {
        seat: SeatId,
        deck: Box<[MaskedCard; 52]>,
        commitment: BaseField,
    },
    Unmask {
        card_index: u8,
        card: MaskedCard,
    },
    GameAction {
        seat: SeatId,
        action: Action,
        amount: Chips,
    },
    HandReveal {
        seat: SeatId,
        rank: u16,
        description: String,
        indices: Vec<u8>,
    },
}

#[derive(Clone, Debug)]
pub struct VerifyJob {
    pub player: PlayerId,
    pub circuit: CircuitType,
    pub proof: ProofJson,
    pub public_signals: Vec<BaseField>,
    pub pending: PendingTransition,
}

/// Everything a room can ask its host to do.
#[derive(Debug)]
pub enum Effect {
    Send {
        to: PlayerId,
        message: ServerMessage,
    },
    Broadcast {
        message: ServerMessage,
    },
    BroadcastExcept {
        except: PlayerId,
        message: ServerMessage,
    },
    Verify(VerifyJob),
    /// (Re)arm the per-turn timer; earlier epochs are stale.
    ArmTurnTimer {
        epoch: u64,
        duration: Duration,
    },
    /// (Re)arm the phase timer for shuffle/unmask/showdown deadlines.
    ArmPhaseTimer {
        epoch: u64,
        duration: Duration,
    },
    /// The last player left; tear the room down.
    DestroyRoom,
}

/// Inbound events, applied in arrival order.
#[derive(Debug)]
pub enum RoomEvent {
    Client {
        player: PlayerId,
        message: ClientMessage,
    },
    VerifyResult {
        player: PlayerId,
        pending: PendingTransition,
        result: Result<(), VerifyError>,
    },
    TurnTimeout {
        epoch: u64,
    },
    PhaseTimeout {
        epoch: u64,
    },
    Disconnected {
        player: PlayerId,
    },
}
