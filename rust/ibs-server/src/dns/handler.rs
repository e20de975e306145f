//! DNS Resolver
//!
//! Maps `<device>.<suffix>.` to the device's current address. Names of any
//! other shape are declined so the server never claims authority outside its
//! suffix.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::api::Metrics;
use crate::config::ServerConfig;
use crate::dns::packet::{TYPE_A, TYPE_AAAA};
use crate::error::{DirectoryError, Result};
use crate::registry::SharedRegistry;

/// A synthesized address record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Record type (A or AAAA)
    pub rtype: u16,

    /// TTL (seconds)
    pub ttl: u32,

    /// Record data
    pub address: IpAddr,
}

/// DNS resolver backed by the device registry
pub struct DnsResolver {
    /// Device registry
    registry: SharedRegistry,

    /// Authoritative suffix label
    suffix: String,

    /// TTL for DNS records (seconds)
    ttl: u32,

    /// Counters
    metrics: Arc<Metrics>,
}

impl DnsResolver {
    /// Create a new resolver
    pub fn new(registry: SharedRegistry, config: &ServerConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            registry,
            suffix: config.dns_suffix.clone(),
            ttl: config.dns_ttl_secs,
            metrics,
        }
    }

    /// Extract the device label from `<device>.<suffix>.`
    pub fn device_label<'a>(&self, name: &'a str) -> Result<&'a str> {
        let parts: Vec<&str> = name.split('.').collect();

        match parts.as_slice() {
            [device, suffix, ""]
                if !device.is_empty() && suffix.eq_ignore_ascii_case(&self.suffix) =>
            {
                Ok(*device)
            }
            _ => Err(DirectoryError::NotHandled(name.to_string())),
        }
    }

    /// Answer one question
    pub async fn resolve(&self, name: &str, qtype: u16) -> Result<Answer> {
        if qtype != TYPE_A && qtype != TYPE_AAAA {
            return Err(DirectoryError::UnsupportedType(qtype));
        }

        let device = self.device_label(name)?;

        let address = {
            let registry = self.registry.read().await;
            registry
                .find_ignore_case(device)
                .map(|record| record.address)
                .ok_or_else(|| DirectoryError::NotFound(device.to_string()))?
        };

        // No record of the requested family
        let matches = match address {
            IpAddr::V4(_) => qtype == TYPE_A,
            IpAddr::V6(_) => qtype == TYPE_AAAA,
        };
        if !matches {
            return Err(DirectoryError::NotFound(device.to_string()));
        }

        debug!(name, %address, "DNS answer");
        self.metrics.inc_dns_answers();

        Ok(Answer {
            rtype: qtype,
            ttl: self.ttl,
            address,
        })
    }

    /// Counters shared with the HTTP API
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use crate::types::DeviceRecord;
    use chrono::Utc;

    async fn resolver_with(devices: &[(&str, &str)]) -> DnsResolver {
        let registry = registry::shared();
        {
            let mut reg = registry.write().await;
            for (name, address) in devices {
                reg.put(DeviceRecord {
                    name: name.to_string(),
                    address: address.parse().unwrap(),
                    hardware_id: "aa:bb:cc:dd:ee:ff".to_string(),
                    last_report: Utc::now(),
                });
            }
        }

        DnsResolver::new(registry, &ServerConfig::default(), Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn test_resolve_registered_device() {
        let resolver = resolver_with(&[("foo", "192.168.0.1")]).await;

        let answer = resolver.resolve("foo.ibs.", TYPE_A).await.unwrap();
        assert_eq!(answer.rtype, TYPE_A);
        assert_eq!(answer.ttl, 60);
        assert_eq!(answer.address, "192.168.0.1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_suffix_scoping() {
        let resolver = resolver_with(&[("foo", "192.168.0.1")]).await;

        for name in ["foo.other.", "foo.ibs.bar.", "ibs.", "foo.ibs", ".ibs.", "a.foo.ibs."] {
            let err = resolver.resolve(name, TYPE_A).await.unwrap_err();
            assert!(
                matches!(err, DirectoryError::NotHandled(_)),
                "{} should be declined, got {:?}",
                name,
                err
            );
        }

        // Suffix match ignores case
        assert!(resolver.resolve("foo.IBS.", TYPE_A).await.is_ok());
    }

    #[tokio::test]
    async fn test_device_label_ignores_case() {
        let resolver = resolver_with(&[("foo", "192.168.0.1"), ("Lab-Pi", "10.0.0.9")]).await;

        // Resolvers may randomize query case
        let answer = resolver.resolve("FoO.iBs.", TYPE_A).await.unwrap();
        assert_eq!(answer.address, "192.168.0.1".parse::<IpAddr>().unwrap());

        let answer = resolver.resolve("lab-pi.ibs.", TYPE_A).await.unwrap();
        assert_eq!(answer.address, "10.0.0.9".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let resolver = resolver_with(&[]).await;
        let err = resolver.resolve("ghost.ibs.", TYPE_A).await.unwrap_err();
        assert_eq!(err, DirectoryError::NotFound("ghost".to_string()));
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let resolver = resolver_with(&[("foo", "192.168.0.1")]).await;
        let err = resolver.resolve("foo.ibs.", 16).await.unwrap_err();
        assert_eq!(err, DirectoryError::UnsupportedType(16));
    }

    #[tokio::test]
    async fn test_address_family() {
        let resolver = resolver_with(&[("v4", "10.0.0.1"), ("v6", "fd00::1")]).await;

        assert!(resolver.resolve("v6.ibs.", TYPE_AAAA).await.is_ok());
        assert!(matches!(
            resolver.resolve("v6.ibs.", TYPE_A).await,
            Err(DirectoryError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve("v4.ibs.", TYPE_AAAA).await,
            Err(DirectoryError::NotFound(_))
        ));
    }
}
