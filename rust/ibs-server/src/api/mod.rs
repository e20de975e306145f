//! HTTP API Module
//!
//! Registration, lookup and listing endpoints for the device directory,
//! plus health and metrics for operators.

mod routes;
mod metrics;

pub use routes::run_api_server;
pub use metrics::Metrics;
