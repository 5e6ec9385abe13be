//! Wire protocol: JSON messages with a `"type"` discriminator, camelCase
//! fields, and decimal-string field elements.

pub mod codec;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::proofs::ProofJson;

pub use codec::WireCard;

pub type PlayerId = Uuid;
pub type RoomId = Uuid;

/// Owner tag carried by `unmask_request`; a card is unmasked either toward a
/// player or toward the table.
pub const COMMUNITY_OWNER: &str = "community";

/// Wire error codes, grouped by how the coordinator responds (reply-only,
/// reply-only turn errors, rejected cryptographic transitions).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidMessage,
    NotConnected,
    NotInRoom,
    RoomNotFound,
    RoomFull,
    NotYourTurn,
    InvalidState,
    InvalidAction,
    InvalidCard,
    AlreadyUnmasked,
    InvalidUnmask,
    InvalidProof,
    CommitmentMismatch,
    Busy,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::NotInRoom => "NOT_IN_ROOM",
            ErrorCode::RoomNotFound => "ROOM_NOT_FOUND",
            ErrorCode::RoomFull => "ROOM_FULL",
            ErrorCode::NotYourTurn => "NOT_YOUR_TURN",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::InvalidAction => "INVALID_ACTION",
            ErrorCode::InvalidCard => "INVALID_CARD",
            ErrorCode::AlreadyUnmasked => "ALREADY_UNMASKED",
            ErrorCode::InvalidUnmask => "INVALID_UNMASK",
            ErrorCode::InvalidProof => "INVALID_PROOF",
            ErrorCode::CommitmentMismatch => "COMMITMENT_MISMATCH",
            ErrorCode::Busy => "BUSY",
        }
    }

    pub fn message(self, detail: impl Into<String>) -> ServerMessage {
        ServerMessage::Error {
            code: self.as_str().to_string(),
            message: detail.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        player_name: String,
        public_key_x: String,
        public_key_y: String,
    },
    LeaveRoom {},
    #[serde(rename_all = "camelCase")]
    Ready { is_ready: bool },
    #[serde(rename_all = "camelCase")]
    SubmitShuffle {
        shuffled_deck: Vec<WireCard>,
        deck_commitment: String,
        proof: ProofJson,
        public_signals: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubmitUnmask {
        card_index: u8,
        unmasked_card: WireCard,
        proof: ProofJson,
        public_signals: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubmitAction {
        action_type: u8,
        amount: u64,
        state_commitment: String,
        proof: ProofJson,
        public_signals: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubmitHandReveal {
        hand_rank: u16,
        hand_description: String,
        card_indices: Vec<u8>,
        proof: ProofJson,
        public_signals: Vec<String>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub seat_index: u8,
    pub player_name: String,
    pub is_ready: bool,
    pub is_connected: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfigWire {
    pub min_players: u8,
    pub max_players: u8,
    pub small_blind: u64,
    pub big_blind: u64,
    pub starting_stack: u64,
    pub turn_timeout_ms: u64,
}

/// Serialized game state; per-seat vectors are seat-ordered.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateWire {
    pub stacks: Vec<u64>,
    pub pot: u64,
    pub street: u8,
    pub current_player: u8,
    pub last_action: u8,
    pub last_bet_size: u64,
    pub street_bets: Vec<u64>,
    pub status: u8,
    pub dealer: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PotShare {
    pub player_id: PlayerId,
    pub amount: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StackEntry {
    pub player_id: PlayerId,
    pub stack: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShowdownPlayer {
    pub player_id: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand_rank: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand_description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Connected { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: RoomId,
        player_id: PlayerId,
        seat_index: u8,
        players: Vec<PlayerInfo>,
        config: RoomConfigWire,
    },
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player_id: PlayerId,
        seat_index: u8,
        player_name: String,
    },
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId, seat_index: u8 },
    #[serde(rename_all = "camelCase")]
    PlayerReady { player_id: PlayerId, is_ready: bool },
    #[serde(rename_all = "camelCase")]
    GameStarted { game_state: GameStateWire },
    #[serde(rename_all = "camelCase")]
    ShuffleTurn {
        player_id: PlayerId,
        seat_index: u8,
        current_deck: Vec<WireCard>,
    },
    #[serde(rename_all = "camelCase")]
    ShuffleComplete {
        player_id: PlayerId,
        deck_commitment: String,
    },
    #[serde(rename_all = "camelCase")]
    CardsDealt { your_cards: Vec<u8> },
    #[serde(rename_all = "camelCase")]
    UnmaskRequest {
        card_index: u8,
        /// Player id, or [`COMMUNITY_OWNER`] for board cards.
        for_player_id: String,
        card: WireCard,
    },
    #[serde(rename_all = "camelCase")]
    CardPartiallyUnmasked {
        card_index: u8,
        by_player_id: PlayerId,
        remaining_unmasks: u8,
    },
    #[serde(rename_all = "camelCase")]
    CardFullyUnmasked {
        card_index: u8,
        card: WireCard,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_community: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    PlayerTurn {
        player_id: PlayerId,
        seat_index: u8,
        valid_actions: Vec<u8>,
        min_bet: u64,
        min_raise: u64,
        amount_to_call: u64,
        timeout_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    ActionResult {
        player_id: PlayerId,
        action_type: u8,
        amount: u64,
        new_pot: u64,
        player_stack: u64,
    },
    #[serde(rename_all = "camelCase")]
    StreetAdvanced {
        street: u8,
        community_card_indices: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    RevealHandRequest {
        pot: u64,
        opponents: Vec<PlayerId>,
    },
    #[serde(rename_all = "camelCase")]
    HandRevealed {
        player_id: PlayerId,
        hand_rank: u16,
        hand_description: String,
        card_indices: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Showdown {
        players: Vec<ShowdownPlayer>,
        winners: Vec<PlayerId>,
        pot_distribution: Vec<PotShare>,
    },
    #[serde(rename_all = "camelCase")]
    GameEnded {
        reason: String,
        final_stacks: Vec<StackEntry>,
    },
    #[serde(rename_all = "camelCase")]
    Error { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_uses_snake_case_tags_and_camel_case_fields() {
        let msg = ClientMessage::JoinRoom {
            room_id: None,
            player_name: "alice".into(),
            public_key_x: "1".into(),
            public_key_y: "2".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "join_room");
        assert_eq!(json["playerName"], "alice");
        assert_eq!(json["publicKeyX"], "1");
        assert!(json.get("roomId").is_none());
    }

    #[test]
    fn submit_action_round_trips() {
        let msg = ClientMessage::SubmitAction {
            action_type: 4,
            amount: 60,
            state_commitment: "12345".into(),
            proof: ProofJson {
                pi_a: vec!["0".into(), "0".into()],
                pi_b: vec![vec!["0".into(), "0".into()], vec!["0".into(), "0".into()]],
                pi_c: vec!["0".into(), "0".into()],
            },
            public_signals: vec!["12345".into()],
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn server_error_shape() {
        let msg = ServerMessage::Error {
            code: "NOT_YOUR_TURN".into(),
            message: "another player is acting".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "NOT_YOUR_TURN");
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let raw = r#"{"type":"warp_deck"}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }
}
