//! Faucet service core logic

use crate::address::parse_address;
use crate::config::FaucetConfig;
use crate::coordinator::{ClaimCoordinator, ClaimOutcome};
use crate::error::{FaucetError, FaucetResult};
use crate::executor::TransferExecutor;
use crate::limiter::RateLimiter;
use crate::metrics::{outcome, FaucetMetrics};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// One incoming claim, after the client identity has been resolved.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub client_key: String,
    pub address: String,
    pub received_at: Instant,
}

impl ClaimRequest {
    pub fn new(client_key: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            client_key: client_key.into(),
            address: address.into(),
            received_at: Instant::now(),
        }
    }
}

/// Public faucet description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetInfo {
    pub account: String,
    pub network: String,
    pub payout: String,
}

/// Faucet service
pub struct FaucetService {
    config: Arc<FaucetConfig>,
    limiter: RateLimiter,
    coordinator: Arc<ClaimCoordinator>,
    metrics: Arc<FaucetMetrics>,
}

impl FaucetService {
    pub fn new(config: FaucetConfig, executor: Arc<dyn TransferExecutor>) -> FaucetResult<Self> {
        config.validate()?;
        let metrics = Arc::new(FaucetMetrics::new()?);
        let coordinator = Arc::new(ClaimCoordinator::new(
            executor,
            config.queue_cap,
            config.payout_minor_units()?,
            metrics.clone(),
        ));

        Ok(Self {
            limiter: RateLimiter::new(config.rate_limit_interval()),
            config: Arc::new(config),
            coordinator,
            metrics,
        })
    }

    /// Validate, rate limit, then hand the claim to the coordinator.
    ///
    /// Invalid or rate-limited claims never reach the queue or the gate.
    pub async fn claim(&self, request: ClaimRequest) -> FaucetResult<ClaimOutcome> {
        if let Err(e) = parse_address(&request.address) {
            self.metrics.record_claim(outcome::INVALID_ADDRESS);
            return Err(e);
        }

        if let Err(wait) = self.limiter.check(&request.client_key, request.received_at) {
            self.metrics.record_claim(outcome::RATE_LIMITED);
            warn!(client = %request.client_key, address = %request.address, "Claim rate limited");
            return Err(FaucetError::RateLimitExceeded(wait));
        }

        info!(client = %request.client_key, address = %request.address, "Claim admitted");
        self.coordinator.claim(&request.address).await
    }

    pub fn info(&self) -> FaucetInfo {
        FaucetInfo {
            account: self.coordinator.executor().sender(),
            network: self.config.network.clone(),
            payout: self.config.payout.to_string(),
        }
    }

    pub fn config(&self) -> &FaucetConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Arc<ClaimCoordinator> {
        &self.coordinator
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn metrics(&self) -> &Arc<FaucetMetrics> {
        &self.metrics
    }
}
