//! Transfer submission capability

use crate::error::FaucetResult;
use async_trait::async_trait;

/// Signs and broadcasts funding transfers from a single account.
///
/// Implementations are not expected to tolerate concurrent `transfer` calls;
/// the coordinator guarantees at most one is in flight. A `transfer` future
/// may be dropped before completion when the caller's deadline passes.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    /// Address of the funding account.
    fn sender(&self) -> String;

    /// Send `amount` minor units to `to`, returning the transaction hash.
    async fn transfer(&self, to: &str, amount: u128) -> FaucetResult<String>;
}
