//! Room-level tests: scripted hands driven through the event/effect seam,
//! with proofs short-circuited the way the verification pool reports them.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use crate::cards::{card_index_of_point, commit_deck, MaskedCard, DECK_SIZE};
use crate::crypto::curve::random_scalar;
use crate::crypto::{hash_fields, BaseField, CurvePoint, ScalarField};
use crate::engine::{Action, Chips};
use crate::proofs::ProofJson;
use crate::protocol::codec::WireCard;
use crate::protocol::{ClientMessage, ErrorCode, PlayerId, ServerMessage};
use crate::ranking::{evaluate_seven, tables::tables};

use super::events::{Effect, RoomEvent};
use super::phases::HandPhase;
use super::room::{RankRoots, Room, RoomConfig};
use super::state_commitment::GameSnapshot;

fn test_roots() -> RankRoots {
    RankRoots {
        basic: BaseField::from(11u64),
        flush: BaseField::from(22u64),
    }
}

fn dummy_proof() -> ProofJson {
    ProofJson {
        pi_a: vec!["0".into(), "0".into()],
        pi_b: vec![vec!["0".into(), "0".into()], vec!["0".into(), "0".into()]],
        pi_c: vec!["0".into(), "0".into()],
    }
}

struct TestClient {
    id: PlayerId,
    secret: ScalarField,
    public: CurvePoint,
    hole_positions: Vec<u8>,
    hole_values: Vec<u8>,
    board_values: Vec<u8>,
}

impl TestClient {
    fn new(rng: &mut StdRng) -> Self {
        let secret = random_scalar(rng);
        Self {
            id: Uuid::new_v4(),
            secret,
            public: CurvePoint::mul_generator(&secret),
            hole_positions: Vec::new(),
            hole_values: Vec::new(),
            board_values: Vec::new(),
        }
    }

    fn join_message(&self) -> ClientMessage {
        ClientMessage::JoinRoom {
            room_id: None,
            player_name: format!("p-{}", &self.id.to_string()[..8]),
            public_key_x: self.public.x.to_string(),
            public_key_y: self.public.y.to_string(),
        }
    }

    /// Identity-permutation shuffle: join the joint key and re-mask every
    /// card, exactly what a proof-backed shuffle does algebraically.
    fn shuffle_response(&self, current_deck: &[WireCard], rng: &mut StdRng) -> ClientMessage {
        let cards: Vec<MaskedCard> = current_deck
            .iter()
            .map(|wire| wire.decode().unwrap())
            .collect();
        let deck: [MaskedCard; DECK_SIZE] = cards.try_into().unwrap();
        let before = commit_deck(&deck).unwrap();
        let shuffled: [MaskedCard; DECK_SIZE] = core::array::from_fn(|i| {
            let nonce = random_scalar(rng);
            deck[i].add_and_mask(&self.secret, &nonce).unwrap()
        });
        let after = commit_deck(&shuffled).unwrap();
        ClientMessage::SubmitShuffle {
            shuffled_deck: shuffled.iter().map(WireCard::from).collect(),
            deck_commitment: after.to_string(),
            proof: dummy_proof(),
            public_signals: vec![
                before.to_string(),
                after.to_string(),
                self.public.x.to_string(),
                self.public.y.to_string(),
            ],
        }
    }

    fn unmask_response(&self, card_index: u8, card_wire: &WireCard) -> ClientMessage {
        let card = card_wire.decode().unwrap();
        let output = card.partial_unmask(&self.secret).unwrap();
        let input_commitment = card.commitment().unwrap();
        let output_commitment = output.commitment().unwrap();
        ClientMessage::SubmitUnmask {
            card_index,
            unmasked_card: WireCard::from(&output),
            proof: dummy_proof(),
            public_signals: vec![
                input_commitment.to_string(),
                output_commitment.to_string(),
                self.public.x.to_string(),
                self.public.y.to_string(),
            ],
        }
    }

    /// Removes the final (own) mask layer from a delivered hole card.
    fn learn_hole_card(&mut self, card_wire: &WireCard) {
        let card = card_wire.decode().unwrap();
        let open = card.partial_unmask(&self.secret).unwrap();
        let value = card_index_of_point(&open.msg).expect("hole card decodes");
        self.hole_values.push(value);
    }
}

/// Runs pending verifications inline, as an always-accepting pool would.
fn pump(room: &mut Room, initial: Vec<Effect>) -> Vec<Effect> {
    let mut queue: VecDeque<Effect> = initial.into();
    let mut out = Vec::new();
    while let Some(effect) = queue.pop_front() {
        if let Effect::Verify(job) = effect {
            let more = room.handle(RoomEvent::VerifyResult {
                player: job.player,
                pending: job.pending,
                result: Ok(()),
            });
            queue.extend(more);
        } else {
            out.push(effect);
        }
    }
    out
}

/// Delivers effects to the clients; shuffle and unmask requests are answered
/// automatically until the room goes quiet.
fn auto_respond(
    room: &mut Room,
    clients: &mut [TestClient],
    effects: Vec<Effect>,
    rng: &mut StdRng,
) -> Vec<ServerMessage> {
    let mut log = Vec::new();
    let mut effects = effects;
    loop {
        let mut responses: Vec<(PlayerId, ClientMessage)> = Vec::new();
        for effect in effects {
            let (targets, message) = match effect {
                Effect::Send { to, message } => (vec![to], message),
                Effect::Broadcast { message } => {
                    (clients.iter().map(|c| c.id).collect(), message)
                }
                Effect::BroadcastExcept { except, message } => (
                    clients.iter().map(|c| c.id).filter(|id| *id != except).collect(),
                    message,
                ),
                Effect::Verify(_) => panic!("verify effects are pumped before delivery"),
                _ => continue,
            };
            log.push(message.clone());
            for target in targets {
                let client = clients.iter_mut().find(|c| c.id == target).unwrap();
                match &message {
                    ServerMessage::ShuffleTurn {
                        player_id,
                        current_deck,
                        ..
                    } if *player_id == client.id => {
                        responses.push((client.id, client.shuffle_response(current_deck, rng)));
                    }
                    ServerMessage::CardsDealt { your_cards } => {
                        client.hole_positions = your_cards.clone();
                    }
                    ServerMessage::UnmaskRequest {
                        card_index, card, ..
                    } => {
                        responses.push((client.id, client.unmask_response(*card_index, card)));
                    }
                    ServerMessage::CardFullyUnmasked {
                        card,
                        is_community,
                        ..
                    } => {
                        if is_community.unwrap_or(false) {
                            let open = card.decode().unwrap();
                            let value = card_index_of_point(&open.msg).unwrap();
                            if !client.board_values.contains(&value) {
                                client.board_values.push(value);
                            }
                        } else {
                            client.learn_hole_card(card);
                        }
                    }
                    _ => {}
                }
            }
        }
        if responses.is_empty() {
            return log;
        }
        let mut next = Vec::new();
        for (player, message) in responses {
            let raw = room.handle(RoomEvent::Client { player, message });
            next.extend(pump(room, raw));
        }
        effects = next;
    }
}

fn submit_action(
    room: &mut Room,
    clients: &mut [TestClient],
    player: PlayerId,
    action: Action,
    amount: Chips,
    rng: &mut StdRng,
) -> Vec<ServerMessage> {
    let before = GameSnapshot::of(room.betting.as_ref().unwrap())
        .commitment()
        .unwrap();
    let mut probe = room.betting.as_ref().unwrap().clone();
    let seat = room.seat_of(&player).unwrap();
    crate::engine::apply_action(&mut probe, seat, action, amount).unwrap();
    let after = GameSnapshot::of(&probe).commitment().unwrap();
    let message = ClientMessage::SubmitAction {
        action_type: action.as_u8(),
        amount,
        state_commitment: after.to_string(),
        proof: dummy_proof(),
        public_signals: vec![
            before.to_string(),
            after.to_string(),
            u64::from(action.as_u8()).to_string(),
            amount.to_string(),
            (u64::from(seat) + 1).to_string(),
        ],
    };
    let raw = room.handle(RoomEvent::Client { player, message });
    let effects = pump(room, raw);
    auto_respond(room, clients, effects, rng)
}

fn submit_reveal(
    room: &mut Room,
    clients: &mut [TestClient],
    index: usize,
    rng: &mut StdRng,
) -> Vec<ServerMessage> {
    let client = &clients[index];
    let player = client.id;
    let mut seven = [0u8; 7];
    seven[..2].copy_from_slice(&client.hole_values);
    seven[2..].copy_from_slice(&client.board_values);
    let best = evaluate_seven(seven);
    let rank = tables().rank_of(best.key, best.is_flush).unwrap();

    let hole_binding = room.hole_commitments[&player];
    let board_fields: Vec<BaseField> = client
        .board_values
        .iter()
        .map(|&v| BaseField::from(u64::from(v)))
        .collect();
    let board_commitment = hash_fields(&board_fields).unwrap();
    let root = if best.is_flush {
        test_roots().flush
    } else {
        test_roots().basic
    };

    let message = ClientMessage::SubmitHandReveal {
        hand_rank: rank,
        hand_description: best.category.describe().to_string(),
        card_indices: best.indices.to_vec(),
        proof: dummy_proof(),
        public_signals: vec![
            root.to_string(),
            hole_binding.to_string(),
            board_commitment.to_string(),
            u64::from(rank).to_string(),
            u64::from(best.is_flush).to_string(),
        ],
    };
    let raw = room.handle(RoomEvent::Client { player, message });
    let effects = pump(room, raw);
    auto_respond(room, clients, effects, rng)
}

/// Seats the clients, readies them, and plays through shuffle, deal, and
/// hole unmasking; the room is left at the preflop betting round.
fn start_heads_up(rng: &mut StdRng) -> (Room, Vec<TestClient>) {
    let mut room = Room::new(Uuid::new_v4(), RoomConfig::default(), test_roots());
    let mut clients = vec![TestClient::new(rng), TestClient::new(rng)];

    for client in &clients {
        let effects = room.handle(RoomEvent::Client {
            player: client.id,
            message: client.join_message(),
        });
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Send { message: ServerMessage::RoomJoined { .. }, .. })));
    }
    for i in 0..clients.len() {
        let player = clients[i].id;
        let raw = room.handle(RoomEvent::Client {
            player,
            message: ClientMessage::Ready { is_ready: true },
        });
        let effects = pump(&mut room, raw);
        auto_respond(&mut room, &mut clients, effects, rng);
    }
    (room, clients)
}

#[test]
fn full_hand_reaches_preflop_with_private_holes() {
    let mut rng = StdRng::seed_from_u64(1000);
    let (room, clients) = start_heads_up(&mut rng);

    assert!(matches!(room.phase(), HandPhase::Betting { .. }));
    // Each client decrypted exactly its own two hole cards.
    for client in &clients {
        assert_eq!(client.hole_positions.len(), 2);
        assert_eq!(client.hole_values.len(), 2);
    }
    // Identity-permutation shuffles leave card values at their positions.
    assert_eq!(clients[0].hole_values, vec![0, 1]);
    assert_eq!(clients[1].hole_values, vec![2, 3]);
    // Hole binding commitments are pinned for the showdown.
    assert_eq!(room.hole_commitments.len(), 2);
}

#[test]
fn owner_never_unmasks_their_own_hole_card() {
    // Heads-up, a single proof from the other player fully reveals a hole
    // card to its owner.
    let mut rng = StdRng::seed_from_u64(2000);
    let (room, _clients) = start_heads_up(&mut rng);
    // If an owner had been asked to unmask their own card the auto-responder
    // would have submitted it and the room would have rejected the share.
    assert!(matches!(room.phase(), HandPhase::Betting { .. }));
}

#[test]
fn fold_hands_the_blinds_to_the_big_blind() {
    let mut rng = StdRng::seed_from_u64(3000);
    let (mut room, mut clients) = start_heads_up(&mut rng);

    // Seat 0 is the dealer/small blind and acts first.
    let dealer_player = room.player_at(0).unwrap().player;
    let log = submit_action(
        &mut room,
        &mut clients,
        dealer_player,
        Action::Fold,
        0,
        &mut rng,
    );
    let ended = log.iter().find_map(|m| match m {
        ServerMessage::GameEnded {
            reason,
            final_stacks,
        } => Some((reason.clone(), final_stacks.clone())),
        _ => None,
    });
    let (reason, stacks) = ended.expect("hand ends");
    assert_eq!(reason, "fold");
    let loser = stacks.iter().find(|s| s.player_id == dealer_player).unwrap();
    let winner = stacks.iter().find(|s| s.player_id != dealer_player).unwrap();
    assert_eq!(loser.stack, 99);
    assert_eq!(winner.stack, 101);
    assert_eq!(room.phase(), HandPhase::Waiting);
}

#[test]
fn check_down_to_showdown_splits_a_tied_pot() {
    let mut rng = StdRng::seed_from_u64(4000);
    let (mut room, mut clients) = start_heads_up(&mut rng);

    let p0 = room.player_at(0).unwrap().player;
    let p1 = room.player_at(1).unwrap().player;

    // Preflop: dealer completes, big blind checks.
    submit_action(&mut room, &mut clients, p0, Action::Call, 0, &mut rng);
    submit_action(&mut room, &mut clients, p1, Action::Check, 0, &mut rng);
    // The flop unmask runs automatically; post-flop the big blind acts first.
    for _ in 0..3 {
        assert!(matches!(room.phase(), HandPhase::Betting { .. }));
        submit_action(&mut room, &mut clients, p1, Action::Check, 0, &mut rng);
        submit_action(&mut room, &mut clients, p0, Action::Check, 0, &mut rng);
    }
    assert_eq!(room.phase(), HandPhase::Showdown);
    assert_eq!(clients[0].board_values.len(), 5);

    submit_reveal(&mut room, &mut clients, 0, &mut rng);
    let log = submit_reveal(&mut room, &mut clients, 1, &mut rng);

    let showdown = log.iter().find_map(|m| match m {
        ServerMessage::Showdown {
            winners,
            pot_distribution,
            ..
        } => Some((winners.clone(), pot_distribution.clone())),
        _ => None,
    });
    let (winners, distribution) = showdown.expect("showdown broadcast");
    // Identity shuffles leave a club-flush board both players share: a tie,
    // split 2/2 with no odd chip.
    assert_eq!(winners.len(), 2);
    let paid: u64 = distribution.iter().map(|p| p.amount).sum();
    assert_eq!(paid, 4);
    for entry in [p0, p1] {
        let seat = if entry == p0 { 0 } else { 1 };
        assert_eq!(room.player_at(seat).unwrap().stack, 100);
    }
}

#[test]
fn out_of_turn_shuffle_is_rejected() {
    let mut rng = StdRng::seed_from_u64(5000);
    let mut room = Room::new(Uuid::new_v4(), RoomConfig::default(), test_roots());
    let mut clients = vec![TestClient::new(&mut rng), TestClient::new(&mut rng)];
    for client in &clients {
        room.handle(RoomEvent::Client {
            player: client.id,
            message: client.join_message(),
        });
    }
    // Ready the first player only: no hand, so a shuffle is INVALID_STATE.
    let player = clients[0].id;
    room.handle(RoomEvent::Client {
        player,
        message: ClientMessage::Ready { is_ready: true },
    });
    let deck: Vec<WireCard> = crate::cards::initial_deck().iter().map(WireCard::from).collect();
    let message = clients[0].shuffle_response(&deck, &mut rng);
    let effects = room.handle(RoomEvent::Client { player, message });
    let rejected = effects.iter().any(|e| match e {
        Effect::Send {
            message: ServerMessage::Error { code, .. },
            ..
        } => code == ErrorCode::InvalidState.as_str(),
        _ => false,
    });
    assert!(rejected);
}

#[test]
fn turn_timeout_auto_folds_the_actor() {
    let mut rng = StdRng::seed_from_u64(6000);
    let (mut room, mut clients) = start_heads_up(&mut rng);

    let epoch = room.turn_epoch;
    let raw = room.handle(RoomEvent::TurnTimeout { epoch });
    let effects = pump(&mut room, raw);
    let log = auto_respond(&mut room, &mut clients, effects, &mut rng);

    // Dealer (seat 0) was to act; the auto-fold ends the hand.
    let ended = log
        .iter()
        .any(|m| matches!(m, ServerMessage::GameEnded { reason, .. } if reason == "fold"));
    assert!(ended);
    assert_eq!(room.player_at(1).unwrap().stack, 101);
}

#[test]
fn stale_timer_epochs_are_ignored() {
    let mut rng = StdRng::seed_from_u64(7000);
    let (mut room, _clients) = start_heads_up(&mut rng);
    let stale = room.turn_epoch - 1;
    let effects = room.handle(RoomEvent::TurnTimeout { epoch: stale });
    assert!(effects.is_empty());
    assert!(matches!(room.phase(), HandPhase::Betting { .. }));
}

#[test]
fn repeated_invalid_proofs_forfeit_the_player() {
    let mut rng = StdRng::seed_from_u64(8000);
    let mut room = Room::new(Uuid::new_v4(), RoomConfig::default(), test_roots());
    let mut clients = vec![TestClient::new(&mut rng), TestClient::new(&mut rng)];
    for client in &clients {
        room.handle(RoomEvent::Client {
            player: client.id,
            message: client.join_message(),
        });
    }
    for client in &clients {
        room.handle(RoomEvent::Client {
            player: client.id,
            message: ClientMessage::Ready { is_ready: true },
        });
    }
    // First shuffler keeps failing verification; after three strikes the
    // hand collapses to the other player.
    let HandPhase::Shuffling { turn } = room.phase() else {
        panic!("expected shuffle phase");
    };
    let offender = room.player_at(turn).unwrap().player;
    let mut ended = false;
    for _ in 0..3 {
        let deck: Vec<WireCard> = room
            .deck
            .as_ref()
            .unwrap()
            .iter()
            .map(WireCard::from)
            .collect();
        let submitter = clients.iter().find(|c| c.id == offender).unwrap();
        let message = submitter.shuffle_response(&deck, &mut rng);
        let effects = room.handle(RoomEvent::Client {
            player: offender,
            message,
        });
        // Fail the pending verification instead of accepting it.
        for effect in effects {
            if let Effect::Verify(job) = effect {
                let more = room.handle(RoomEvent::VerifyResult {
                    player: job.player,
                    pending: job.pending,
                    result: Err(crate::proofs::VerifyError::Invalid),
                });
                ended |= more.iter().any(|e| {
                    matches!(
                        e,
                        Effect::Broadcast {
                            message: ServerMessage::GameEnded { .. }
                        }
                    )
                });
            }
        }
    }
    assert!(ended, "three strikes must end the hand");
    assert_eq!(room.phase(), HandPhase::Waiting);
}
