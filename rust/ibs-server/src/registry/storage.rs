//! Device Registry Storage
//!
//! In-memory table of device records. Nothing is written to disk; the
//! directory starts empty on every restart and reporters repopulate it
//! within one report interval.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::liveness::{Census, Thresholds};
use super::ownership::{self, Admission};
use crate::error::Result;
use crate::types::{Claim, DeviceRecord};

/// Device registry keyed by name
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceRecord>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a device by name
    pub fn get(&self, name: &str) -> Option<&DeviceRecord> {
        self.devices.get(name)
    }

    /// Get a device by name, ignoring ASCII case
    ///
    /// An exact match wins. Among case variants the lowest name is picked so
    /// the answer does not depend on map order.
    pub fn find_ignore_case(&self, name: &str) -> Option<&DeviceRecord> {
        self.devices.get(name).or_else(|| {
            self.devices
                .values()
                .filter(|record| record.name.eq_ignore_ascii_case(name))
                .min_by(|a, b| a.name.cmp(&b.name))
        })
    }

    /// Insert or overwrite a record without any ownership check
    pub fn put(&mut self, record: DeviceRecord) {
        self.devices.insert(record.name.clone(), record);
    }

    /// Copy out every record
    pub fn list(&self) -> Vec<(String, DeviceRecord)> {
        self.devices
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    /// Apply a registration attempt
    ///
    /// Reads the current record, runs the ownership rule and writes the new
    /// record in one call. Holding `&mut self` for the whole sequence is what
    /// keeps two first-time registrations for one name from both winning.
    pub fn register(
        &mut self,
        claim: Claim,
        passkey: &str,
        report_time: DateTime<Utc>,
    ) -> Result<Admission> {
        let admission = match ownership::authorize(self.devices.get(&claim.name), &claim, passkey) {
            Ok(admission) => admission,
            Err(e) => {
                warn!(device = %claim.name, "Registration rejected: {}", e);
                return Err(e);
            }
        };

        match admission {
            Admission::Created => info!(device = %claim.name, address = %claim.address, "📝 New device registered"),
            Admission::Updated => debug!(device = %claim.name, address = %claim.address, "Device updated"),
        }

        self.put(DeviceRecord {
            name: claim.name,
            address: claim.address,
            hardware_id: claim.hardware_id,
            last_report: report_time,
        });

        Ok(admission)
    }

    /// Count devices per liveness tier
    pub fn census(&self, now: DateTime<Utc>, thresholds: &Thresholds) -> Census {
        let mut census = Census::default();
        for record in self.devices.values() {
            census.record(thresholds.classify(record.age_secs(now)));
        }
        census
    }

    /// Get total device count
    pub fn len(&self) -> usize {
        self.devices.len()
    }
}
