//! Liveness Classification
//!
//! Devices report every 5 minutes. A device is online while its last report
//! is at most one interval old, missing while it is at most 30 minutes old,
//! and offline after that. Both bounds are inclusive on whole seconds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ServerConfig;

/// Default max age for online devices (seconds)
pub const ONLINE_SECS: u64 = 5 * 60;

/// Default max age for missing devices (seconds)
pub const MISSING_SECS: u64 = 30 * 60;

/// Liveness tier of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Online,
    Missing,
    Offline,
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Liveness::Online => "online",
            Liveness::Missing => "missing",
            Liveness::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Age bounds for the liveness tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub online_secs: u64,
    pub missing_secs: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            online_secs: ONLINE_SECS,
            missing_secs: MISSING_SECS,
        }
    }
}

impl Thresholds {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            online_secs: config.online_threshold_secs,
            missing_secs: config.missing_threshold_secs,
        }
    }

    /// Classify a record by the age of its last report
    pub fn classify(&self, age_secs: u64) -> Liveness {
        if age_secs <= self.online_secs {
            Liveness::Online
        } else if age_secs <= self.missing_secs {
            Liveness::Missing
        } else {
            Liveness::Offline
        }
    }
}

/// Device counts per liveness tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    pub online: usize,
    pub missing: usize,
    pub offline: usize,
}

impl Census {
    pub fn record(&mut self, liveness: Liveness) {
        match liveness {
            Liveness::Online => self.online += 1,
            Liveness::Missing => self.missing += 1,
            Liveness::Offline => self.offline += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.online + self.missing + self.offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        let t = Thresholds::default();

        assert_eq!(t.classify(0), Liveness::Online);
        assert_eq!(t.classify(5 * 60), Liveness::Online);
        assert_eq!(t.classify(5 * 60 + 7), Liveness::Missing);
        assert_eq!(t.classify(30 * 60), Liveness::Missing);
        assert_eq!(t.classify(30 * 60 + 1), Liveness::Offline);
        assert_eq!(t.classify(31 * 60), Liveness::Offline);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = Thresholds {
            online_secs: 10,
            missing_secs: 20,
        };
        assert_eq!(t.classify(11), Liveness::Missing);
        assert_eq!(t.classify(21), Liveness::Offline);
    }

    #[test]
    fn test_census() {
        let mut census = Census::default();
        census.record(Liveness::Online);
        census.record(Liveness::Online);
        census.record(Liveness::Offline);

        assert_eq!(census.online, 2);
        assert_eq!(census.missing, 0);
        assert_eq!(census.total(), 3);
    }

    #[test]
    fn test_display_matches_json() {
        for tier in [Liveness::Online, Liveness::Missing, Liveness::Offline] {
            let json = serde_json::to_string(&tier).unwrap();
            assert_eq!(json, format!("\"{}\"", tier));
        }
    }
}
