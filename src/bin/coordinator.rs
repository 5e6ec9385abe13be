use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use zk_holdem::engine::Stakes;
use zk_holdem::game::RoomConfig;
use zk_holdem::server::{load_artifacts, run_server, ServerConfig};

/// Mental-poker coordinator: verifies every state transition against a
/// zero-knowledge proof and never learns a hidden card.
#[derive(Parser, Debug)]
#[command(name = "coordinator", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,

    /// Directory holding verification keys, the Poseidon reference vector,
    /// and the pinned hand-rank Merkle roots.
    #[arg(long, default_value = "./artifacts")]
    artifacts_dir: PathBuf,

    #[arg(long, default_value_t = 2)]
    min_players: u8,

    #[arg(long, default_value_t = 10)]
    max_players: u8,

    #[arg(long, default_value_t = 1)]
    small_blind: u64,

    #[arg(long, default_value_t = 2)]
    big_blind: u64,

    #[arg(long, default_value_t = 100)]
    starting_stack: u64,

    /// Per-turn betting deadline in seconds; expiry auto-folds.
    #[arg(long, default_value_t = 60)]
    turn_timeout_secs: u64,

    /// Shuffle/unmask/showdown deadline in seconds; expiry forfeits.
    #[arg(long, default_value_t = 30)]
    phase_timeout_secs: u64,

    /// Concurrent proof verifications across all rooms.
    #[arg(long, default_value_t = 2)]
    verify_workers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let artifacts = load_artifacts(&args.artifacts_dir)?;

    let config = ServerConfig {
        bind: args.bind,
        artifacts_dir: args.artifacts_dir,
        room: RoomConfig {
            min_players: args.min_players,
            max_players: args.max_players,
            stakes: Stakes {
                small_blind: args.small_blind,
                big_blind: args.big_blind,
            },
            starting_stack: args.starting_stack,
            turn_timeout: Duration::from_secs(args.turn_timeout_secs),
            phase_timeout: Duration::from_secs(args.phase_timeout_secs),
        },
        verify_workers: args.verify_workers,
    };
    run_server(config, artifacts).await
}
