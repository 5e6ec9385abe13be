//! Process bootstrap: artifact preload, hash self-check, and the serve loop.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

use crate::crypto::poseidon::{check_reference_vector, ReferenceVector};
use crate::game::{RankRoots, RoomConfig};
use crate::proofs::VerifierRegistry;
use crate::protocol::codec::parse_field;
use crate::ranking::tables::rank_trees;

use super::connection::ConnectionManager;
use super::registry::RoomRegistry;
use super::verify_pool::{VerifyPool, DEFAULT_WORKERS};
use super::ws::{router, AppState};

const LOG_TARGET: &str = "server::bootstrap";

pub struct ServerConfig {
    pub bind: SocketAddr,
    pub artifacts_dir: PathBuf,
    pub room: RoomConfig,
    pub verify_workers: usize,
}

/// Everything loaded once at startup and immutable afterwards.
pub struct Artifacts {
    pub verifier: VerifierRegistry,
    pub rank_roots: RankRoots,
}

#[derive(Deserialize)]
struct HashCheckFile {
    inputs: Vec<String>,
    digest: String,
}

#[derive(Deserialize)]
struct RankRootsFile {
    basic: String,
    flush: String,
}

/// Loads verification keys, runs the Poseidon reference-vector check, and
/// pins the hand-rank Merkle roots against the freshly built tables. Any
/// mismatch is fatal: serving with a divergent hash or root would reject
/// every honest proof.
pub fn load_artifacts(dir: &Path) -> Result<Artifacts> {
    let verifier = VerifierRegistry::load_from_dir(dir)?;

    let check_path = dir.join("poseidon_check.json");
    let raw = std::fs::read_to_string(&check_path)
        .with_context(|| format!("reading {}", check_path.display()))?;
    let file: HashCheckFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", check_path.display()))?;
    let vector = ReferenceVector {
        inputs: file
            .inputs
            .iter()
            .map(|s| parse_field(s).map_err(anyhow::Error::msg))
            .collect::<Result<Vec<_>>>()?,
        digest: parse_field(&file.digest).map_err(anyhow::Error::msg)?,
    };
    check_reference_vector(&vector).context("poseidon reference vector check failed")?;
    info!(target: LOG_TARGET, "poseidon reference vector verified");

    let roots_path = dir.join("rank_roots.json");
    let raw = std::fs::read_to_string(&roots_path)
        .with_context(|| format!("reading {}", roots_path.display()))?;
    let file: RankRootsFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", roots_path.display()))?;
    let pinned = RankRoots {
        basic: parse_field(&file.basic).map_err(anyhow::Error::msg)?,
        flush: parse_field(&file.flush).map_err(anyhow::Error::msg)?,
    };

    let trees = rank_trees();
    let computed = RankRoots {
        basic: trees.basic.root(),
        flush: trees.flush.root(),
    };
    if pinned != computed {
        bail!(
            "hand-rank merkle roots diverge from the generated tables \
             (pinned basic {}, computed {})",
            file.basic,
            computed.basic
        );
    }
    info!(target: LOG_TARGET, "hand-rank merkle roots pinned");

    Ok(Artifacts {
        verifier,
        rank_roots: computed,
    })
}

pub async fn run_server(config: ServerConfig, artifacts: Artifacts) -> Result<()> {
    let connections = Arc::new(ConnectionManager::new());
    let pool = Arc::new(VerifyPool::new(
        Arc::new(artifacts.verifier),
        if config.verify_workers == 0 {
            DEFAULT_WORKERS
        } else {
            config.verify_workers
        },
    ));
    let registry = Arc::new(RoomRegistry::new(
        Arc::clone(&connections),
        pool,
        config.room.clone(),
        artifacts.rank_roots,
    ));

    let app = router(AppState {
        connections,
        registry,
    });
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(target: LOG_TARGET, %local_addr, "coordinator listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    use tracing::warn;

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target: LOG_TARGET,
            error = %err,
            "failed to install ctrl-c handler"
        );
    }
    info!(target: LOG_TARGET, "shutdown signal received");
}
