// # Public IP Source Trait
//
// Defines the interface for discovering the caller's public IP address.
//
// ## Implementations
//
// - Cloudflare trace endpoint: `cfddns-ip-trace` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::PublicIpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* PublicIpSource implementation */;
//
//     let ip = source.current().await?;
//     if ip.is_empty() {
//         println!("no usable IP this time");
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for public IP source implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - One bounded request per call, no internal retries. The engine's
///   refresh interval is the only retry cadence.
/// - Transport failures and non-2xx answers are errors.
/// - A well-formed answer that carries no address is **not** an error:
///   `current()` returns an empty string and the engine skips the cycle.
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// Resolve the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The address as text, or `""` if the service answered
    ///   without one
    /// - `Err(Error::Resolution)`: If the service was unreachable or failed
    async fn current(&self) -> Result<String, crate::Error>;

    /// Check that the backing service is reachable and healthy
    ///
    /// Used by the readiness probe. Must not parse or cache anything.
    async fn probe(&self) -> Result<(), crate::Error>;

    /// Name of this source (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
