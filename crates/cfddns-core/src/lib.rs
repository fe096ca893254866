// # cfddns-core
//
// Core library for the Cloudflare dynamic DNS updater.
//
// ## Architecture Overview
//
// This library provides the reconciliation logic for dynamic DNS updates:
// - **PublicIpSource**: Trait for resolving the caller's public IPv4 address
// - **DnsGateway**: Trait for reading and updating records via a provider API
// - **DdnsEngine**: Periodic loop that reconciles every configured zone
//   against the resolved public IP
// - **DdnsConfig**: YAML configuration model and file discovery
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Loop logic never talks HTTP directly
// 2. **Failure Isolation**: A broken zone or record never aborts its siblings
// 3. **Idempotency**: Records already pointing at the public IP are left alone
// 4. **Library-First**: The daemon is a thin wrapper around this crate

pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod traits;

// Re-export core types for convenience
pub use config::{DdnsConfig, HealthConfig, RecordConfig, ZoneConfig};
pub use engine::{CycleReport, DdnsEngine, EngineEvent};
pub use error::{Error, Result};
pub use traits::{DnsGateway, DnsRecord, PublicIpSource, RecordUpdate, ZoneDetails};
