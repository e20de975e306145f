//! Metrics Collection
//!
//! Counters for registrations and DNS traffic, plus device gauges refreshed
//! from the registry whenever metrics are read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::DirectoryError;
use crate::registry::liveness::Census;

/// Metrics collector for the directory server
#[derive(Default)]
pub struct Metrics {
    /// Start time for uptime calculation
    start_time: Option<Instant>,

    /// Total registration requests received
    pub registrations_received: AtomicU64,

    /// Accepted registrations that claimed a new name
    pub registrations_created: AtomicU64,

    /// Accepted registrations from an existing owner
    pub registrations_updated: AtomicU64,

    /// Rejected: malformed body or address
    pub rejected_bad_request: AtomicU64,

    /// Rejected: wrong passkey
    pub rejected_unauthorized: AtomicU64,

    /// Rejected: name owned by other hardware
    pub rejected_conflict: AtomicU64,

    /// DNS messages answered
    pub dns_queries: AtomicU64,

    /// DNS questions seen
    pub dns_questions: AtomicU64,

    /// DNS answer records produced
    pub dns_answers: AtomicU64,

    /// DNS questions left unanswered
    pub dns_failures: AtomicU64,

    /// Devices per liveness tier
    pub devices_online: AtomicU64,
    pub devices_missing: AtomicU64,
    pub devices_offline: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn inc_registrations_received(&self) {
        self.registrations_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_registrations_created(&self) {
        self.registrations_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_registrations_updated(&self) {
        self.registrations_updated.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a rejected registration under its reason
    pub fn inc_rejected(&self, error: &DirectoryError) {
        let counter = match error {
            DirectoryError::Unauthorized => &self.rejected_unauthorized,
            DirectoryError::Conflict(_) => &self.rejected_conflict,
            _ => &self.rejected_bad_request,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dns_queries(&self) {
        self.dns_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dns_questions(&self) {
        self.dns_questions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dns_answers(&self) {
        self.dns_answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dns_failures(&self) {
        self.dns_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Update device gauges
    pub fn set_census(&self, census: &Census) {
        self.devices_online.store(census.online as u64, Ordering::Relaxed);
        self.devices_missing.store(census.missing as u64, Ordering::Relaxed);
        self.devices_offline.store(census.offline as u64, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        let mut push = |name: &str, kind: &str, help: &str, value: u64| {
            output.push_str(&format!(
                "# HELP ibs_{name} {help}\n# TYPE ibs_{name} {kind}\nibs_{name} {value}\n\n"
            ));
        };

        push("uptime_seconds", "gauge", "Server uptime in seconds", self.uptime_secs());

        // Registrations
        push(
            "registrations_total",
            "counter",
            "Registration requests received",
            self.registrations_received.load(Ordering::Relaxed),
        );
        push(
            "registrations_created",
            "counter",
            "Registrations that claimed a new name",
            self.registrations_created.load(Ordering::Relaxed),
        );
        push(
            "registrations_updated",
            "counter",
            "Registrations from an existing owner",
            self.registrations_updated.load(Ordering::Relaxed),
        );
        push(
            "registrations_rejected_bad_request",
            "counter",
            "Registrations with a malformed body or address",
            self.rejected_bad_request.load(Ordering::Relaxed),
        );
        push(
            "registrations_rejected_unauthorized",
            "counter",
            "Registrations with a wrong passkey",
            self.rejected_unauthorized.load(Ordering::Relaxed),
        );
        push(
            "registrations_rejected_conflict",
            "counter",
            "Registrations for a name owned by other hardware",
            self.rejected_conflict.load(Ordering::Relaxed),
        );

        // DNS
        push(
            "dns_queries",
            "counter",
            "DNS messages answered",
            self.dns_queries.load(Ordering::Relaxed),
        );
        push(
            "dns_questions",
            "counter",
            "DNS questions seen",
            self.dns_questions.load(Ordering::Relaxed),
        );
        push(
            "dns_answers",
            "counter",
            "DNS answer records produced",
            self.dns_answers.load(Ordering::Relaxed),
        );
        push(
            "dns_failures",
            "counter",
            "DNS questions left unanswered",
            self.dns_failures.load(Ordering::Relaxed),
        );

        // Devices
        push(
            "devices_online",
            "gauge",
            "Devices reported within the online window",
            self.devices_online.load(Ordering::Relaxed),
        );
        push(
            "devices_missing",
            "gauge",
            "Devices past the online window",
            self.devices_missing.load(Ordering::Relaxed),
        );
        push(
            "devices_offline",
            "gauge",
            "Devices past the missing window",
            self.devices_offline.load(Ordering::Relaxed),
        );

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_secs": self.uptime_secs(),
            "registrations": {
                "received": self.registrations_received.load(Ordering::Relaxed),
                "created": self.registrations_created.load(Ordering::Relaxed),
                "updated": self.registrations_updated.load(Ordering::Relaxed),
                "rejected": {
                    "bad_request": self.rejected_bad_request.load(Ordering::Relaxed),
                    "unauthorized": self.rejected_unauthorized.load(Ordering::Relaxed),
                    "conflict": self.rejected_conflict.load(Ordering::Relaxed),
                },
            },
            "dns": {
                "queries": self.dns_queries.load(Ordering::Relaxed),
                "questions": self.dns_questions.load(Ordering::Relaxed),
                "answers": self.dns_answers.load(Ordering::Relaxed),
                "failures": self.dns_failures.load(Ordering::Relaxed),
            },
            "devices": {
                "online": self.devices_online.load(Ordering::Relaxed),
                "missing": self.devices_missing.load(Ordering::Relaxed),
                "offline": self.devices_offline.load(Ordering::Relaxed),
            },
        })
    }
}
