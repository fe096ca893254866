//! Core traits for the DDNS updater
//!
//! This module defines the seams between the reconciliation loop and the
//! outside world.
//!
//! - [`PublicIpSource`]: Resolve the caller's public IP address
//! - [`DnsGateway`]: Read zones and records, and update records, via a provider API

pub mod dns_gateway;
pub mod ip_source;

pub use dns_gateway::{DnsGateway, DnsRecord, RecordType, RecordUpdate, ZoneDetails};
pub use ip_source::PublicIpSource;
