//! The coordinator server: connection manager, per-room actors, the bounded
//! verification pool, and the WebSocket wire router.

pub mod bootstrap;
pub mod connection;
pub mod registry;
pub mod verify_pool;
pub mod ws;

pub use bootstrap::{load_artifacts, run_server, Artifacts, ServerConfig};
pub use connection::ConnectionManager;
pub use registry::RoomRegistry;
pub use verify_pool::VerifyPool;
