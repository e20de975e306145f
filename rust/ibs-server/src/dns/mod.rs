//! DNS Server Module
//!
//! Answers `<device>.<suffix>.` queries with the device's registered address.
//!
//! ## DNS Records
//!
//! - A records: devices registered with an IPv4 address
//! - AAAA records: devices registered with an IPv6 address
//!
//! Replies are authoritative and carry a short TTL since reporters move.

mod handler;
mod packet;
mod server;

pub use server::run_dns_server;
