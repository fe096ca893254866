// # DNS Gateway Trait
//
// Defines the interface the reconciliation loop uses to read zones and
// records from a DNS provider and to overwrite a record's content.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::traits::{DnsGateway, RecordType, RecordUpdate};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let gateway = /* DnsGateway implementation */;
//
//     let zone = gateway.zone_details("023e105f4ecef8ad9ca31a8372d0c353").await?;
//     if let Some(record) = gateway.find_record(&zone.id, RecordType::A, &zone.name).await? {
//         let update = RecordUpdate::a(&record.name, "203.0.113.5", false);
//         gateway.update_dns_record(&zone.id, &record.id, &update).await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata about a zone, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDetails {
    /// Provider-specific zone identifier
    pub id: String,
    /// Apex domain of the zone, e.g. "example.com"
    pub name: String,
}

/// A DNS record as currently stored by the provider
///
/// Read, compared, and conditionally overwritten. Never cached across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-specific record identifier
    pub id: String,
    /// Record type, e.g. "A", "AAAA", "CNAME"
    #[serde(rename = "type")]
    pub record_type: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the IP address for A/AAAA records)
    pub content: String,
    /// Whether traffic is proxied through the provider
    #[serde(default)]
    pub proxied: bool,
    /// Time-to-live (1 = automatic on Cloudflare)
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// Address record types the updater knows how to match
///
/// AAAA records are not managed yet, so only `A` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
}

impl RecordType {
    /// Wire representation of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New state for an existing record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUpdate {
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// New content
    pub content: String,
    /// Whether traffic is proxied through the provider
    pub proxied: bool,
}

impl RecordUpdate {
    /// An A record update
    pub fn a(name: impl Into<String>, content: impl Into<String>, proxied: bool) -> Self {
        Self {
            record_type: RecordType::A,
            name: name.into(),
            content: content.into(),
            proxied,
        }
    }
}

/// Trait for DNS provider gateways
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - Isolated and stateless: no caching between calls.
/// - No retry or backoff: return the error, the engine skips the zone or
///   record and tries again next cycle.
/// - Paginated listings are aggregated before returning.
/// - Never decide whether an update is needed (owned by `DdnsEngine`).
#[async_trait]
pub trait DnsGateway: Send + Sync {
    /// Fetch a zone's metadata, notably its apex domain
    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails, crate::Error>;

    /// List every DNS record in a zone, across all pages
    async fn list_dns_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Overwrite an existing record
    async fn update_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<(), crate::Error>;

    /// List every zone the credentials can see
    ///
    /// Used at startup to verify the credentials before the loop begins.
    async fn list_zones(&self) -> Result<Vec<ZoneDetails>, crate::Error>;

    /// Find the first record with an exact type and fully-qualified name
    ///
    /// Linear scan over [`DnsGateway::list_dns_records`], in the provider's
    /// listing order. `Ok(None)` means no record matched.
    async fn find_record(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
    ) -> Result<Option<DnsRecord>, crate::Error> {
        let records = self.list_dns_records(zone_id).await?;
        Ok(records
            .into_iter()
            .find(|record| record.record_type == record_type.as_str() && record.name == name))
    }

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
