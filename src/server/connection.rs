//! Peer session registry and routed delivery.
//!
//! Rooms own `seat -> playerId`; the connection side stores `playerId ->
//! roomId` and looks rooms up by id, so the natural room/player cycle is
//! broken by stable identifiers.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{PlayerId, RoomId, ServerMessage};

const LOG_TARGET: &str = "server::connection";

pub struct ConnectionManager {
    senders: DashMap<PlayerId, mpsc::UnboundedSender<ServerMessage>>,
    room_of: DashMap<PlayerId, RoomId>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
            room_of: DashMap::new(),
        }
    }

    pub fn register(&self, player: PlayerId, sender: mpsc::UnboundedSender<ServerMessage>) {
        self.senders.insert(player, sender);
    }

    pub fn unregister(&self, player: &PlayerId) {
        self.senders.remove(player);
        self.room_of.remove(player);
    }

    pub fn set_room(&self, player: PlayerId, room: RoomId) {
        self.room_of.insert(player, room);
    }

    pub fn clear_room(&self, player: &PlayerId) {
        self.room_of.remove(player);
    }

    pub fn room_of(&self, player: &PlayerId) -> Option<RoomId> {
        self.room_of.get(player).map(|entry| *entry)
    }

    pub fn send(&self, player: &PlayerId, message: ServerMessage) {
        if let Some(sender) = self.senders.get(player) {
            if sender.send(message).is_err() {
                debug!(target: LOG_TARGET, %player, "send to closed session dropped");
            }
        }
    }

    pub fn broadcast(&self, players: &[PlayerId], message: &ServerMessage) {
        for player in players {
            self.send(player, message.clone());
        }
    }

    pub fn broadcast_except(
        &self,
        players: &[PlayerId],
        except: &PlayerId,
        message: &ServerMessage,
    ) {
        for player in players.iter().filter(|p| *p != except) {
            self.send(player, message.clone());
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn routed_send_reaches_only_the_target() {
        let manager = ConnectionManager::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        manager.register(a, tx_a);
        manager.register(b, tx_b);

        manager.send(&a, ServerMessage::Connected { player_id: a });
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());

        manager.broadcast_except(&[a, b], &a, &ServerMessage::Connected { player_id: b });
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unregister_clears_room_mapping() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let player = Uuid::new_v4();
        let room = Uuid::new_v4();
        manager.register(player, tx);
        manager.set_room(player, room);
        assert_eq!(manager.room_of(&player), Some(room));
        manager.unregister(&player);
        assert_eq!(manager.room_of(&player), None);
    }
}
