//! Ownership Rule
//!
//! Two independent gates run in order for every registration:
//!
//! 1. the caller knows the shared passkey,
//! 2. the caller's hardware identity matches the one that claimed the name.
//!
//! The first accepted registration for a name claims it. Later registrations
//! may only overwrite the record from the same hardware identity.

use crate::error::{DirectoryError, Result};
use crate::types::{Claim, DeviceRecord};

/// Outcome of an accepted registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First registration for this name
    Created,
    /// Re-registration by the owner
    Updated,
}

/// Check the shared passkey
pub fn check_passkey(presented: &str, configured: &str) -> Result<()> {
    if presented.len() != configured.len() {
        return Err(DirectoryError::Unauthorized);
    }

    // Compare every byte so timing does not leak the matching prefix
    let diff = presented
        .bytes()
        .zip(configured.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    if diff == 0 {
        Ok(())
    } else {
        Err(DirectoryError::Unauthorized)
    }
}

/// Check that the claim may take over `current`
pub fn check_owner(current: Option<&DeviceRecord>, claim: &Claim) -> Result<Admission> {
    match current {
        None => Ok(Admission::Created),
        Some(record) if record.hardware_id == claim.hardware_id => Ok(Admission::Updated),
        Some(_) => Err(DirectoryError::Conflict(claim.name.clone())),
    }
}

/// Run both gates in order
pub fn authorize(
    current: Option<&DeviceRecord>,
    claim: &Claim,
    passkey: &str,
) -> Result<Admission> {
    check_passkey(&claim.passkey, passkey)?;
    check_owner(current, claim)
}
