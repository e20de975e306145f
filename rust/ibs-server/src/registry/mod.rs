//! Device Registry Module
//!
//! Holds the name → device table in memory and decides who may write to it.
//! One `SharedRegistry` is created at startup and handed to both the DNS and
//! the HTTP front ends.

mod storage;
pub mod liveness;
pub mod ownership;

pub use storage::DeviceRegistry;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Registry shared between the front ends
pub type SharedRegistry = Arc<RwLock<DeviceRegistry>>;

/// Create an empty shared registry
pub fn shared() -> SharedRegistry {
    Arc::new(RwLock::new(DeviceRegistry::new()))
}
