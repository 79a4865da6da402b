//! Prometheus metrics for the faucet

use crate::error::FaucetResult;
use prometheus::{
    histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder,
};

/// Claim outcome label values.
pub mod outcome {
    pub const DIRECT: &str = "direct";
    pub const QUEUED: &str = "queued";
    pub const QUEUE_FULL: &str = "queue_full";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INVALID_ADDRESS: &str = "invalid_address";
    pub const TRANSFER_FAILED: &str = "transfer_failed";
}

/// Transfer path label values.
pub mod path {
    pub const DIRECT: &str = "direct";
    pub const QUEUE: &str = "queue";
}

#[derive(Debug)]
pub struct FaucetMetrics {
    registry: Registry,

    pub claims_total: IntCounterVec,
    pub transfers_total: IntCounterVec,
    pub queue_length: IntGauge,
    pub transfer_duration: HistogramVec,
}

impl FaucetMetrics {
    pub fn new() -> FaucetResult<Self> {
        let registry = Registry::new();

        let claims_total = IntCounterVec::new(
            opts!("faucet_claims_total", "Claims handled, by outcome"),
            &["outcome"],
        )?;
        let transfers_total = IntCounterVec::new(
            opts!("faucet_transfers_total", "Transfers submitted, by path and result"),
            &["path", "result"],
        )?;
        let queue_length = IntGauge::with_opts(opts!(
            "faucet_queue_length",
            "Addresses waiting in the claim queue"
        ))?;
        let transfer_duration = HistogramVec::new(
            histogram_opts!(
                "faucet_transfer_duration_seconds",
                "Time spent in a single transfer submission"
            ),
            &["path"],
        )?;

        registry.register(Box::new(claims_total.clone()))?;
        registry.register(Box::new(transfers_total.clone()))?;
        registry.register(Box::new(queue_length.clone()))?;
        registry.register(Box::new(transfer_duration.clone()))?;

        Ok(Self {
            registry,
            claims_total,
            transfers_total,
            queue_length,
            transfer_duration,
        })
    }

    pub fn record_claim(&self, outcome: &str) {
        self.claims_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_transfer(&self, path: &str, ok: bool, seconds: f64) {
        let result = if ok { "success" } else { "failure" };
        self.transfers_total.with_label_values(&[path, result]).inc();
        self.transfer_duration.with_label_values(&[path]).observe(seconds);
    }

    /// Render all metrics in the Prometheus text format.
    pub fn gather(&self) -> FaucetResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::error::FaucetError::Internal(e.to_string()))
    }
}
