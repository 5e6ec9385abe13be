//! Bounded CPU pool for proof verification.
//!
//! Verification is pairing-heavy and must not starve other rooms: at most
//! `workers` proofs verify concurrently process-wide, each on a blocking
//! thread. The result re-enters the owning room's mailbox as an event.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use crate::game::{RoomEvent, VerifyJob};
use crate::proofs::ProofVerifier;

const LOG_TARGET: &str = "server::verify";

pub const DEFAULT_WORKERS: usize = 2;

pub struct VerifyPool {
    verifier: Arc<dyn ProofVerifier>,
    permits: Arc<Semaphore>,
}

impl VerifyPool {
    pub fn new(verifier: Arc<dyn ProofVerifier>, workers: usize) -> Self {
        Self {
            verifier,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Queues a verification; the outcome is delivered to `reply` as a
    /// [`RoomEvent::VerifyResult`]. A closed mailbox (room torn down while
    /// the proof was in flight) drops the result.
    pub fn spawn(&self, job: VerifyJob, reply: mpsc::UnboundedSender<RoomEvent>) {
        let verifier = Arc::clone(&self.verifier);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.expect("semaphore open");
            let VerifyJob {
                player,
                circuit,
                proof,
                public_signals,
                pending,
            } = job;
            let signals = public_signals.clone();
            let result = tokio::task::spawn_blocking(move || {
                verifier.verify(circuit, &proof, &signals)
            })
            .await
            .unwrap_or_else(|err| {
                warn!(target: LOG_TARGET, error = %err, "verification task panicked");
                Err(crate::proofs::VerifyError::Invalid)
            });

            debug!(
                target: LOG_TARGET,
                %player,
                circuit = circuit.as_str(),
                ok = result.is_ok(),
                "verification finished"
            );
            let _ = reply.send(RoomEvent::VerifyResult {
                player,
                pending,
                result,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::BaseField;
    use crate::game::PendingTransition;
    use crate::proofs::{CircuitType, ProofJson, VerifyError};
    use uuid::Uuid;

    struct RejectAll;
    impl ProofVerifier for RejectAll {
        fn verify(
            &self,
            _circuit: CircuitType,
            _proof: &ProofJson,
            _signals: &[BaseField],
        ) -> Result<(), VerifyError> {
            Err(VerifyError::Invalid)
        }
    }

    #[tokio::test]
    async fn results_come_back_through_the_mailbox() {
        let pool = VerifyPool::new(Arc::new(RejectAll), 2);
        let (tx, mut rx) = mpsc::unbounded_channel();
        pool.spawn(
            VerifyJob {
                player: Uuid::new_v4(),
                circuit: CircuitType::Unmask,
                proof: ProofJson {
                    pi_a: vec![],
                    pi_b: vec![],
                    pi_c: vec![],
                },
                public_signals: vec![],
                pending: PendingTransition::GameAction {
                    seat: 0,
                    action: crate::engine::Action::Fold,
                    amount: 0,
                },
            },
            tx,
        );
        let event = rx.recv().await.expect("result delivered");
        match event {
            RoomEvent::VerifyResult { result, .. } => {
                assert_eq!(result, Err(VerifyError::Invalid));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
