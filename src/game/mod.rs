//! Room and hand orchestration.

pub mod events;
mod hand;
pub mod phases;
pub mod room;
pub mod state_commitment;
pub mod unmask;

#[cfg(test)]
mod tests;

pub use events::{Effect, PendingTransition, RoomEvent, VerifyJob};
pub use phases::HandPhase;
pub use room::{new_room_id, RankRoots, Room, RoomConfig, SeatEntry};
pub use state_commitment::GameSnapshot;
pub use unmask::{CardOwner, UnmaskTracker};
