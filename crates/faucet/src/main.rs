//! Faucet service binary

use clap::Parser;
use seq_faucet::api::build_router;
use seq_faucet::logging::{init_logging, LogFormat};
use seq_faucet::{DrainLoop, FaucetConfig, FaucetService, RpcTransferExecutor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tracing::info;

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long)]
    server_addr: Option<String>,

    /// Count of reverse proxies in front of the server
    #[arg(long)]
    proxy_count: Option<usize>,

    /// Maximum transactions waiting to be sent
    #[arg(long)]
    queue_cap: Option<usize>,

    /// Number of whole tokens to transfer per claim
    #[arg(long)]
    payout: Option<u64>,

    /// Number of minutes to wait between claims from one client
    #[arg(long)]
    interval_minutes: Option<u64>,

    /// Network name to display on the frontend
    #[arg(long)]
    network: Option<String>,

    /// Private key hex to fund user requests with
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// JSON-RPC endpoint
    #[arg(long, env = "WEB3_PROVIDER")]
    rpc_url: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn apply(self, config: &mut FaucetConfig) {
        if let Some(addr) = self.server_addr {
            config.server_addr = addr;
        }
        if let Some(count) = self.proxy_count {
            config.proxy_count = count;
        }
        if let Some(cap) = self.queue_cap {
            config.queue_cap = cap;
        }
        if let Some(payout) = self.payout {
            config.payout = payout;
        }
        if let Some(minutes) = self.interval_minutes {
            config.interval_minutes = minutes;
        }
        if let Some(network) = self.network {
            config.network = network;
        }
        if let Some(key) = self.private_key {
            config.private_key = key;
        }
        if let Some(rpc_url) = self.rpc_url {
            config.rpc_url = rpc_url;
        }
        if self.debug {
            config.log_level = "debug".to_string();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = FaucetConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    init_logging(&config.log_level, LogFormat::from(config.log_format.as_str()))?;

    info!("Starting faucet v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Server address: {}", config.server_addr);
    info!("  RPC URL: {}", config.rpc_url);
    info!("  Network: {}", config.network);
    info!("  Payout: {} ({} minor units)", config.payout, config.payout_minor_units()?);
    info!("  Claim interval: {} minutes", config.interval_minutes);
    info!("  Trusted proxies: {}", config.proxy_count);
    info!("  Queue capacity: {}", config.queue_cap);

    let executor = RpcTransferExecutor::connect(
        &config.rpc_url,
        &config.private_key,
        config.gas_price_minor_units()?,
        config.gas_limit,
    )
    .await?;

    let addr: SocketAddr = config.server_socket_addr()?;
    let service = Arc::new(FaucetService::new(config, Arc::new(executor))?);
    info!("Faucet account: {}", service.info().account);

    let shutdown = Arc::new(Notify::new());
    let drain = Arc::new(DrainLoop::new(service.coordinator().clone()));
    let drain_handle = drain.spawn(shutdown.clone());

    let app = build_router(service);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.notify_one();
    drain_handle.await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
