//! Directory Server Configuration
//!
//! Configurable parameters for the IBS directory service.
//! Defaults match the reporter daemon's 5 minute report cadence.

use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;

/// Main configuration for the directory server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    // === Network ===

    /// Address both front ends bind to
    pub bind_address: IpAddr,

    /// Port for the HTTP directory API
    pub http_port: u16,

    /// Port for the DNS server (UDP)
    pub dns_port: u16,

    // === Security ===

    /// Shared secret every registration must present
    pub passkey: String,

    /// Use the client-supplied timestamp as the report time.
    /// Only for reporters that predate server-side stamping.
    pub trust_client_timestamp: bool,

    // === DNS ===

    /// Pseudo-TLD the resolver is authoritative for (no dots)
    pub dns_suffix: String,

    /// TTL for synthesized address records (seconds)
    pub dns_ttl_secs: u32,

    // === HTTP ===

    /// Serve `GET /dns/{name}` plain-text lookups
    pub http_resolver: bool,

    /// Records older than this are left out of the device list (seconds).
    /// 0 lists everything.
    pub list_horizon_secs: u64,

    // === Liveness ===

    /// Max age still classified as online (seconds, inclusive)
    pub online_threshold_secs: u64,

    /// Max age still classified as missing (seconds, inclusive)
    pub missing_threshold_secs: u64,

    /// Interval between status census log lines (seconds)
    pub status_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Network
            bind_address: IpAddr::from([0, 0, 0, 0]),
            http_port: 8080,
            dns_port: 5353, // Use 53 in production with proper permissions

            // Security
            passkey: String::new(),
            trust_client_timestamp: false,

            // DNS - keep TTL low, addresses move
            dns_suffix: "ibs".to_string(),
            dns_ttl_secs: 60,

            // HTTP
            http_resolver: true,
            list_horizon_secs: 600, // 10 minutes

            // Liveness
            online_threshold_secs: 300,   // 5 minutes
            missing_threshold_secs: 1800, // 30 minutes
            status_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    // Builder-style methods for CLI overrides

    pub fn with_http_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.http_port = port;
        }
        self
    }

    pub fn with_dns_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.dns_port = port;
        }
        self
    }

    pub fn with_passkey(mut self, passkey: Option<String>) -> Self {
        if let Some(passkey) = passkey {
            self.passkey = passkey;
        }
        self
    }

    /// Device list horizon, `None` when filtering is off
    pub fn list_horizon(&self) -> Option<u64> {
        Some(self.list_horizon_secs).filter(|secs| *secs > 0)
    }

    /// Validate configuration values
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.passkey.is_empty() {
            anyhow::bail!("passkey must be set (config file or --passkey)");
        }

        if self.dns_suffix.is_empty() || self.dns_suffix.contains('.') {
            anyhow::bail!(
                "dns_suffix ({:?}) must be a single non-empty label",
                self.dns_suffix
            );
        }

        if self.dns_ttl_secs == 0 {
            anyhow::bail!("dns_ttl_secs must be greater than zero");
        }

        if self.online_threshold_secs >= self.missing_threshold_secs {
            anyhow::bail!(
                "online_threshold_secs ({}) must be less than missing_threshold_secs ({})",
                self.online_threshold_secs,
                self.missing_threshold_secs
            );
        }

        if self.status_interval_secs == 0 {
            anyhow::bail!("status_interval_secs must be greater than zero");
        }

        Ok(())
    }
}
