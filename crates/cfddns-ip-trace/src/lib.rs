// # Trace IP Source
//
// This crate provides the public IP source for the DDNS updater.
//
// ## Purpose
//
// Cloudflare's `cdn-cgi/trace` endpoint on 1.1.1.1 echoes connection
// metadata back to the caller as plain-text `key=value` lines:
//
// ```text
// fl=12f34
// h=1.1.1.1
// ip=203.0.113.5
// ts=1700000000.123
// visit_scheme=https
// ```
//
// Requesting it over IPv4 yields the caller's public IPv4 address on the
// `ip=` line.
//
// ## Architecture
//
// One GET per `current()` call, bounded by a request timeout. No caching
// and no retries: the engine's refresh interval is the retry cadence.

use async_trait::async_trait;
use cfddns_core::traits::PublicIpSource;
use cfddns_core::{Error, Result};
use std::time::Duration;

/// Well-known trace endpoint used to discover the public IP
pub const PUBLIC_IP_PAGE: &str = "https://1.1.1.1/cdn-cgi/trace";

/// Public IP source backed by a trace endpoint
#[derive(Debug, Clone)]
pub struct TraceIpSource {
    /// URL to fetch the trace from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl TraceIpSource {
    /// Create a source for a custom endpoint and request timeout
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint answering in trace format
    /// - `timeout`: Upper bound for each request
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// The endpoint this source queries
    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the endpoint and fail on transport errors or non-2xx status
    async fn fetch(&self) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::resolution(format!(
                "Public IP resolver ({}) returned status code {}",
                self.url,
                status.as_u16()
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl PublicIpSource for TraceIpSource {
    async fn current(&self) -> Result<String> {
        let body = self
            .fetch()
            .await?
            .text()
            .await
            .map_err(|e| Error::resolution(format!("Cannot read body: {e}")))?;

        let ip = parse_trace_body(&body);
        if ip.is_empty() {
            tracing::warn!("Trace response from {} contains no ip line", self.url);
        }
        Ok(ip)
    }

    async fn probe(&self) -> Result<()> {
        self.fetch().await.map(|_| ())
    }

    fn source_name(&self) -> &'static str {
        "cloudflare-trace"
    }
}

/// Extract the address from a trace response body
///
/// Returns the value after `=` on the first line containing `ip`, or an
/// empty string if there is no such line.
pub fn parse_trace_body(body: &str) -> String {
    body.lines()
        .find(|line| line.contains("ip"))
        .and_then(|line| line.split('=').nth(1))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}
