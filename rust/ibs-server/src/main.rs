//! IBS Directory Server
//!
//! Keeps a live directory of devices so they can be found by name while
//! their addresses change.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    IBS DIRECTORY SERVER                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP API (8080)     ←── Reporters POST every 5 minutes     │
//! │  Device Registry     ←── In-memory name → address table     │
//! │  DNS Server (5353)   ←── Answers <device>.ibs. queries      │
//! │  Status Task         ←── Logs online/missing/offline counts │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod api;
mod config;
mod dns;
mod error;
mod registry;
mod types;

use api::Metrics;
use config::ServerConfig;
use registry::liveness::Thresholds;
use registry::SharedRegistry;

/// IBS Directory Server - find your devices by name
#[derive(Parser, Debug)]
#[command(name = "ibss")]
#[command(author = "IBS Contributors")]
#[command(version)]
#[command(about = "Dynamic device directory served over DNS and HTTP", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ibss.toml")]
    config: PathBuf,

    /// HTTP API port
    #[arg(long)]
    http_port: Option<u16>,

    /// DNS server port (requires root or CAP_NET_BIND_SERVICE for port 53)
    #[arg(long)]
    dns_port: Option<u16>,

    /// Shared passkey for registrations (overrides the config file)
    #[arg(long)]
    passkey: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into())
        )
        .init();

    info!("🌐 IBS Directory Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        ServerConfig::load(&args.config)?
    } else {
        warn!("Config file {:?} not found, using defaults", args.config);
        ServerConfig::default()
    };

    // Override config with CLI args
    let config = config
        .with_http_port(args.http_port)
        .with_dns_port(args.dns_port)
        .with_passkey(args.passkey);

    config.validate()?;

    info!("⚙️  Configuration:");
    info!("   HTTP port: {}", config.http_port);
    info!("   DNS port: {}", config.dns_port);
    info!("   DNS suffix: .{} (TTL {}s)", config.dns_suffix, config.dns_ttl_secs);
    info!("   List horizon: {}s", config.list_horizon_secs);
    if config.trust_client_timestamp {
        warn!("   Liveness uses client-supplied timestamps");
    }

    let shared_config = Arc::new(config);

    // Registry lives in memory only
    let registry = registry::shared();
    let metrics = Arc::new(Metrics::new());

    // Start all services concurrently
    let dns_handle = tokio::spawn(dns::run_dns_server(
        shared_config.clone(),
        registry.clone(),
        metrics.clone(),
    ));

    let api_handle = tokio::spawn(api::run_api_server(
        shared_config.clone(),
        registry.clone(),
        metrics.clone(),
    ));

    let status_handle = tokio::spawn(run_status_report(
        shared_config.clone(),
        registry.clone(),
    ));

    info!("✅ All services started");
    info!("   Press Ctrl+C to shutdown");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
        result = dns_handle => {
            error!("DNS server exited: {:?}", result);
        }
        result = api_handle => {
            error!("HTTP API exited: {:?}", result);
        }
        result = status_handle => {
            error!("Status task exited: {:?}", result);
        }
    }

    info!("👋 IBS Directory Server shutting down ({} devices dropped)", registry.read().await.len());
    Ok(())
}

/// Periodically log the liveness census
async fn run_status_report(
    config: Arc<ServerConfig>,
    registry: SharedRegistry,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(
        std::time::Duration::from_secs(config.status_interval_secs)
    );
    let thresholds = Thresholds::from_config(&config);

    loop {
        interval.tick().await;

        let census = {
            let reg = registry.read().await;
            reg.census(Utc::now(), &thresholds)
        };

        info!(
            "📊 Status: {} devices ({} online, {} missing, {} offline)",
            census.total(),
            census.online,
            census.missing,
            census.offline
        );
    }
}
