//! Per-claim decision between direct funding and queueing

use crate::error::{FaucetError, FaucetResult};
use crate::executor::TransferExecutor;
use crate::gate::ExecutionGate;
use crate::metrics::{outcome, path, FaucetMetrics};
use crate::queue::ClaimQueue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Deadline for a transfer executed on the request path.
pub const DIRECT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of an admitted claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Parked for the drain loop.
    Queued { address: String },
    /// Funded on the request path.
    Funded { address: String, tx_hash: String },
}

impl ClaimOutcome {
    pub fn message(&self) -> String {
        match self {
            ClaimOutcome::Queued { address } => format!("Added {} to the queue", address),
            ClaimOutcome::Funded { tx_hash, .. } => format!("Txhash: {}", tx_hash),
        }
    }
}

/// Owns the queue and the gate, and holds the transfer capability they protect.
pub struct ClaimCoordinator {
    executor: Arc<dyn TransferExecutor>,
    queue: ClaimQueue,
    gate: ExecutionGate,
    payout: u128,
    metrics: Arc<FaucetMetrics>,
}

impl ClaimCoordinator {
    pub fn new(
        executor: Arc<dyn TransferExecutor>,
        queue_capacity: usize,
        payout: u128,
        metrics: Arc<FaucetMetrics>,
    ) -> Self {
        Self {
            executor,
            queue: ClaimQueue::new(queue_capacity),
            gate: ExecutionGate::new(),
            payout,
            metrics,
        }
    }

    /// Fund `address` directly when nothing is queued and the gate is free,
    /// otherwise queue it.
    ///
    /// The emptiness check and the enqueue are not atomic with respect to a
    /// concurrent drain; ordering between the two paths is best effort.
    pub async fn claim(&self, address: &str) -> FaucetResult<ClaimOutcome> {
        let guard = if self.queue.is_empty() {
            self.gate.try_acquire()
        } else {
            None
        };

        let Some(guard) = guard else {
            return self.enqueue(address);
        };

        let started = Instant::now();
        let result = tokio::time::timeout(
            DIRECT_TRANSFER_TIMEOUT,
            self.executor.transfer(address, self.payout),
        )
        .await;
        guard.release();

        let elapsed = started.elapsed().as_secs_f64();
        match result {
            Ok(Ok(tx_hash)) => {
                self.metrics.record_transfer(path::DIRECT, true, elapsed);
                self.metrics.record_claim(outcome::DIRECT);
                info!(address, tx_hash = %tx_hash, "Funded directly successfully");
                Ok(ClaimOutcome::Funded {
                    address: address.to_string(),
                    tx_hash,
                })
            }
            Ok(Err(e)) => {
                self.metrics.record_transfer(path::DIRECT, false, elapsed);
                self.metrics.record_claim(outcome::TRANSFER_FAILED);
                error!(address, error = %e, "Failed to send transaction");
                Err(FaucetError::TransferFailed(e.to_string()))
            }
            Err(_) => {
                self.metrics.record_transfer(path::DIRECT, false, elapsed);
                self.metrics.record_claim(outcome::TRANSFER_FAILED);
                error!(address, "Transfer timed out");
                Err(FaucetError::TransferTimeout(DIRECT_TRANSFER_TIMEOUT))
            }
        }
    }

    fn enqueue(&self, address: &str) -> FaucetResult<ClaimOutcome> {
        if self.queue.try_enqueue(address.to_string()) {
            self.metrics.queue_length.set(self.queue.len() as i64);
            self.metrics.record_claim(outcome::QUEUED);
            info!(address, "Added to queue successfully");
            Ok(ClaimOutcome::Queued {
                address: address.to_string(),
            })
        } else {
            self.metrics.record_claim(outcome::QUEUE_FULL);
            warn!(capacity = self.queue.capacity(), "Max queue capacity reached");
            Err(FaucetError::QueueFull)
        }
    }

    pub fn queue(&self) -> &ClaimQueue {
        &self.queue
    }

    pub fn gate(&self) -> &ExecutionGate {
        &self.gate
    }

    pub fn executor(&self) -> &Arc<dyn TransferExecutor> {
        &self.executor
    }

    pub fn payout(&self) -> u128 {
        self.payout
    }

    pub fn metrics(&self) -> &Arc<FaucetMetrics> {
        &self.metrics
    }
}
