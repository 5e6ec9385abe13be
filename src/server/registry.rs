//! Room registry and the per-room actor.
//!
//! Each room runs as one task draining an unbounded mailbox; all room-state
//! mutation happens there, in arrival order. The actor interprets the
//! room's effects: routed sends, verification dispatch, timer arms, and
//! teardown. Rooms never await each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::game::{new_room_id, Effect, RankRoots, Room, RoomConfig, RoomEvent};
use crate::protocol::{ClientMessage, ErrorCode, PlayerId, RoomId, ServerMessage};

use super::connection::ConnectionManager;
use super::verify_pool::VerifyPool;

const LOG_TARGET: &str = "server::registry";

#[derive(Clone)]
struct RoomHandle {
    tx: mpsc::UnboundedSender<RoomEvent>,
    cancel: CancellationToken,
}

pub struct RoomRegistry {
    rooms: DashMap<RoomId, RoomHandle>,
    connections: Arc<ConnectionManager>,
    pool: Arc<VerifyPool>,
    room_config: RoomConfig,
    rank_roots: RankRoots,
}

impl RoomRegistry {
    pub fn new(
        connections: Arc<ConnectionManager>,
        pool: Arc<VerifyPool>,
        room_config: RoomConfig,
        rank_roots: RankRoots,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            connections,
            pool,
            room_config,
            rank_roots,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Routes a join: into the named room when it exists, otherwise into a
    /// fresh one (an absent `roomId` always creates).
    pub fn join(self: &Arc<Self>, player: PlayerId, message: ClientMessage) {
        let requested = match &message {
            ClientMessage::JoinRoom { room_id, .. } => *room_id,
            _ => return,
        };
        let room_id = match requested {
            Some(id) => {
                if !self.rooms.contains_key(&id) {
                    self.connections.send(
                        &player,
                        ErrorCode::RoomNotFound.message("no such room"),
                    );
                    return;
                }
                id
            }
            None => self.spawn_room(),
        };
        if let Some(handle) = self.rooms.get(&room_id) {
            let _ = handle.tx.send(RoomEvent::Client { player, message });
        }
    }

    /// Routes any in-room message by the player's current room mapping.
    pub fn route(&self, player: PlayerId, message: ClientMessage) {
        let Some(room_id) = self.connections.room_of(&player) else {
            self.connections
                .send(&player, ErrorCode::NotInRoom.message("join a room first"));
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            self.connections
                .send(&player, ErrorCode::RoomNotFound.message("room is gone"));
            return;
        };
        let _ = handle.tx.send(RoomEvent::Client { player, message });
    }

    pub fn disconnect(&self, player: PlayerId) {
        if let Some(room_id) = self.connections.room_of(&player) {
            if let Some(handle) = self.rooms.get(&room_id) {
                let _ = handle.tx.send(RoomEvent::Disconnected { player });
            }
        }
    }

    fn spawn_room(self: &Arc<Self>) -> RoomId {
        let id = new_room_id();
        let room = Room::new(id, self.room_config.clone(), self.rank_roots);
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = RoomHandle {
            tx: tx.clone(),
            cancel: cancel.clone(),
        };
        self.rooms.insert(id, handle);
        info!(target: LOG_TARGET, room = %id, "room created");

        let registry = Arc::clone(self);
        tokio::spawn(room_task(room, rx, tx, cancel, registry));
        id
    }

    fn remove_room(&self, id: &RoomId) {
        if let Some((_, handle)) = self.rooms.remove(id) {
            handle.cancel.cancel();
            info!(target: LOG_TARGET, room = %id, "room destroyed");
        }
    }
}

async fn room_task(
    mut room: Room,
    mut rx: mpsc::UnboundedReceiver<RoomEvent>,
    self_tx: mpsc::UnboundedSender<RoomEvent>,
    cancel: CancellationToken,
    registry: Arc<RoomRegistry>,
) {
    let room_id = room.id;
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let effects = room.handle(event);
        let members = room.players();
        let mut destroy = false;
        for effect in effects {
            match effect {
                Effect::Send { to, message } => {
                    track_membership(&registry, &room_id, &message);
                    registry.connections.send(&to, message);
                }
                Effect::Broadcast { message } => {
                    track_membership(&registry, &room_id, &message);
                    registry.connections.broadcast(&members, &message);
                }
                Effect::BroadcastExcept { except, message } => {
                    track_membership(&registry, &room_id, &message);
                    registry
                        .connections
                        .broadcast_except(&members, &except, &message);
                }
                Effect::Verify(job) => {
                    registry.pool.spawn(job, self_tx.clone());
                }
                Effect::ArmTurnTimer { epoch, duration } => {
                    let tx = self_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(duration).await;
                        let _ = tx.send(RoomEvent::TurnTimeout { epoch });
                    });
                }
                Effect::ArmPhaseTimer { epoch, duration } => {
                    let tx = self_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(duration).await;
                        let _ = tx.send(RoomEvent::PhaseTimeout { epoch });
                    });
                }
                Effect::DestroyRoom => destroy = true,
            }
        }
        if destroy {
            registry.remove_room(&room_id);
            break;
        }
    }
    debug!(target: LOG_TARGET, room = %room_id, "room task exited");
}

/// Keeps `playerId -> roomId` in step with the room's own announcements.
fn track_membership(registry: &RoomRegistry, room_id: &RoomId, message: &ServerMessage) {
    match message {
        ServerMessage::RoomJoined { player_id, .. } => {
            registry.connections.set_room(*player_id, *room_id);
        }
        ServerMessage::PlayerLeft { player_id, .. } => {
            registry.connections.clear_room(player_id);
        }
        _ => {}
    }
}
