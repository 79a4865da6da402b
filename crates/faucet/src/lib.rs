//! Token faucet with serialized transfer submission
//!
//! Every claim is rate limited per client, then either funded directly or
//! parked in a bounded queue that a background loop drains. At most one
//! transfer is ever in flight, because the funding account's nonce must
//! advance strictly in order.

pub mod address;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod drain;
pub mod error;
pub mod executor;
pub mod gate;
pub mod limiter;
pub mod logging;
pub mod metrics;
pub mod queue;
pub mod rpc;
pub mod service;

pub use config::FaucetConfig;
pub use coordinator::{ClaimCoordinator, ClaimOutcome};
pub use drain::{DrainLoop, DrainReport, DrainState};
pub use error::{FaucetError, FaucetResult};
pub use executor::TransferExecutor;
pub use gate::{ExecutionGate, GateGuard};
pub use limiter::{client_key, RateLimiter};
pub use metrics::FaucetMetrics;
pub use queue::ClaimQueue;
pub use rpc::{BlockchainRpcClient, RpcTransferExecutor};
pub use service::{ClaimRequest, FaucetInfo, FaucetService};
