//! Faucet configuration

use crate::error::{FaucetError, FaucetResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Longest accepted claim interval: ten years.
pub const MAX_INTERVAL_MINUTES: u64 = 10 * 365 * 24 * 60;

/// Faucet service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    /// Server address
    pub server_addr: String,

    /// Network name shown by `/api/info`
    pub network: String,

    /// RPC endpoint for blockchain
    pub rpc_url: String,

    /// Faucet account private key (hex)
    #[serde(skip_serializing)]
    pub private_key: String,

    /// Whole tokens paid per claim
    pub payout: u64,

    /// Decimals between a whole token and its minor unit
    pub payout_decimals: u32,

    /// Minutes a client must wait between claims
    pub interval_minutes: u64,

    /// Number of trusted reverse proxies in front of the server
    pub proxy_count: usize,

    /// Maximum claims waiting in the queue
    pub queue_cap: usize,

    /// Gas price to use (in minor units)
    pub gas_price: String,

    /// Gas limit for transactions
    pub gas_limit: u64,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log format (pretty, compact, json)
    pub log_format: String,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:8080".to_string(),
            network: "Sequencer Network".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            private_key: String::new(),
            payout: 1,
            payout_decimals: 9,
            interval_minutes: 1440, // 24 hours
            proxy_count: 0,
            queue_cap: 100,
            gas_price: "1000000000".to_string(), // 1 Gwei
            gas_limit: 21000,
            cors_enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl FaucetConfig {
    /// Defaults, overlaid by an optional config file, overlaid by
    /// `FAUCET_*` environment variables.
    pub fn load(path: Option<&Path>) -> FaucetResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            let path_str = path
                .to_str()
                .ok_or_else(|| FaucetError::InvalidConfig("invalid config path".to_string()))?;
            builder = builder.add_source(config::File::with_name(path_str));
        }

        builder
            .add_source(config::Environment::with_prefix("FAUCET"))
            .build()
            .and_then(|settings| settings.try_deserialize::<Self>())
            .map_err(|e| FaucetError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> FaucetResult<()> {
        self.server_socket_addr()?;
        self.payout_minor_units()?;
        self.gas_price_minor_units()?;
        if self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(FaucetError::InvalidConfig(format!(
                "interval_minutes {} exceeds maximum {}",
                self.interval_minutes, MAX_INTERVAL_MINUTES
            )));
        }
        Ok(())
    }

    pub fn server_socket_addr(&self) -> FaucetResult<SocketAddr> {
        self.server_addr.parse().map_err(|e| {
            FaucetError::InvalidConfig(format!("server_addr {}: {}", self.server_addr, e))
        })
    }

    /// Payout in minor units: `payout * 10^payout_decimals`.
    pub fn payout_minor_units(&self) -> FaucetResult<u128> {
        10u128
            .checked_pow(self.payout_decimals)
            .and_then(|scale| scale.checked_mul(u128::from(self.payout)))
            .ok_or_else(|| {
                FaucetError::InvalidConfig(format!(
                    "payout {} with {} decimals overflows",
                    self.payout, self.payout_decimals
                ))
            })
    }

    pub fn gas_price_minor_units(&self) -> FaucetResult<u128> {
        self.gas_price
            .parse()
            .map_err(|_| FaucetError::InvalidConfig(format!("invalid gas price: {}", self.gas_price)))
    }

    /// Get rate limit interval
    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}
