//! Core types for directory communication
//!
//! These types define the protocol between reporter daemons, lookup clients
//! and the directory server. All timestamps are UTC and serialize as RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::{DirectoryError, Result};
use crate::registry::liveness::Liveness;

// =============================================================================
// DEVICE RECORDS
// =============================================================================

/// One registered device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Registration key
    pub name: String,

    /// Current network address
    pub address: IpAddr,

    /// Hardware identity of the owner (MAC-shaped, compared verbatim)
    pub hardware_id: String,

    /// Time of the last accepted registration, as stamped by the server
    pub last_report: DateTime<Utc>,
}

impl DeviceRecord {
    /// Whole seconds since the last accepted report, never negative
    pub fn age_secs(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.last_report)
            .num_seconds()
            .max(0) as u64
    }

    /// Check if the record is older than `horizon_secs`
    pub fn is_stale(&self, now: DateTime<Utc>, horizon_secs: u64) -> bool {
        self.age_secs(now) > horizon_secs
    }
}

// =============================================================================
// REGISTRATION PROTOCOL
// =============================================================================

/// Registration body posted by reporter daemons
///
/// Older reporters used different field names; the aliases accept them.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    /// Device name to claim
    #[serde(alias = "deviceName")]
    pub identifier: String,

    /// Hardware address of the reporting interface
    #[serde(alias = "deviceMac")]
    pub mac: String,

    /// Address to publish
    #[serde(alias = "ip", alias = "addressReport")]
    pub address: String,

    /// Reporter's clock at send time
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Shared passkey
    pub passkey: String,
}

impl RegistrationRequest {
    /// Validate the request into a claim on a name
    pub fn into_claim(self) -> Result<Claim> {
        if self.identifier.is_empty() {
            return Err(DirectoryError::BadRequest("Empty identifier".to_string()));
        }

        let address = self
            .address
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| DirectoryError::BadRequest("Invalid IP address".to_string()))?;

        Ok(Claim {
            name: self.identifier,
            hardware_id: self.mac,
            address,
            passkey: self.passkey,
            reported_at: self.timestamp,
        })
    }
}

/// A validated registration attempt
#[derive(Debug, Clone)]
pub struct Claim {
    pub name: String,
    pub hardware_id: String,
    pub address: IpAddr,
    pub passkey: String,
    pub reported_at: Option<DateTime<Utc>>,
}

// =============================================================================
// STATUS VIEWS
// =============================================================================

/// Public view of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub device_name: String,
    pub address: String,
    pub timestamp: DateTime<Utc>,
    pub status: Liveness,
}

impl DeviceStatus {
    /// Build the view of `record` as seen at `status`
    pub fn new(record: &DeviceRecord, status: Liveness) -> Self {
        Self {
            device_name: record.name.clone(),
            address: record.address.to_string(),
            timestamp: record.last_report,
            status,
        }
    }
}
