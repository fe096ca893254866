// # Cloudflare DNS Gateway
//
// This crate provides the Cloudflare implementation of `DnsGateway`.
//
// ## Behaviour
//
// - One HTTP request per page; listings are aggregated across all pages
// - Full error propagation to the engine (the engine skips and retries next cycle)
// - HTTP timeout configured from `request_timeout`
// - Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - Dry-run mode for safe testing
// - NO retry logic, NO caching, NO background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Gateway construction fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Zone details: GET `/zones/:zone_id`
// - List zones: GET `/zones?page=N&per_page=50`
// - List DNS records: GET `/zones/:zone_id/dns_records?page=N&per_page=100`
// - Update DNS record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::DdnsConfig;
use cfddns_core::traits::{DnsGateway, DnsRecord, RecordUpdate, ZoneDetails};
use cfddns_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Page size for DNS record listings (Cloudflare maximum is 5000)
const RECORDS_PER_PAGE: u32 = 100;

/// Page size for zone listings (Cloudflare maximum is 50)
const ZONES_PER_PAGE: u32 = 50;

const PROVIDER: &str = "cloudflare";

/// Standard Cloudflare v4 response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cloudflare DNS gateway
///
/// Stateless: every call goes to the API, nothing is cached between calls.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the gateway will:
/// - Perform all GET requests (zone details, record listings)
/// - Log the intended PATCH payload
/// - **NOT** actually modify DNS records
pub struct CloudflareGateway {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PATCH updates
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareGateway")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareGateway {
    /// Create a new Cloudflare gateway
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `timeout`: Upper bound for each HTTP request
    ///
    /// # Errors
    ///
    /// Fails if the token is empty or the HTTP client cannot be built.
    pub fn new(api_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run: false,
        })
    }

    /// Create a gateway from the daemon configuration
    pub fn from_config(config: &DdnsConfig, dry_run: bool) -> Result<Self> {
        let timeout = config.request_timeout()?;
        let gateway = Self::new(config.api_token.clone(), timeout)?.with_dry_run(dry_run);

        if dry_run {
            tracing::warn!("Cloudflare gateway running in DRY-RUN mode - no changes will be made");
        }

        Ok(gateway)
    }

    /// Point the gateway at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether updates are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap the response envelope
    ///
    /// `what` describes the operation for error messages.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<ApiResponse<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed ({what}): {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(map_status_error(status, &error_text, what));
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::provider(PROVIDER, format!("Failed to parse response ({what}): {e}"))
        })?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER,
                format!("{what} failed: {}", describe_errors(&envelope.errors)),
            ));
        }

        Ok(envelope)
    }

    /// GET every page of a listing endpoint
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        per_page: u32,
        what: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self
                .client
                .get(self.url(path))
                .query(&[("page", page), ("per_page", per_page)]);
            let envelope: ApiResponse<Vec<T>> = self.send(request, what).await?;

            items.extend(envelope.result.unwrap_or_default());

            let total_pages = envelope
                .result_info
                .map(|info| info.total_pages.max(info.page))
                .unwrap_or(page);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("Fetched {} item(s) over {} page(s) for {}", items.len(), page, what);
        Ok(items)
    }
}

/// Map a non-success HTTP status to the matching error variant
fn map_status_error(status: StatusCode, body: &str, what: &str) -> Error {
    let detail = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .map(|envelope| describe_errors(&envelope.errors))
        .unwrap_or_else(|_| body.to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions ({what}). Status: {status}"
        )),
        404 => Error::not_found(format!("{what}: {detail}")),
        409 => Error::provider(
            PROVIDER,
            format!("Conflict: record is being updated by another process ({what}). Status: {status}"),
        ),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded ({what}). Please retry later. Status: {status}"
        )),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Cloudflare server error (transient) ({what}): {status} - {detail}"),
        ),
        _ => Error::provider(PROVIDER, format!("{what} failed: {status} - {detail}")),
    }
}

#[async_trait]
impl DnsGateway for CloudflareGateway {
    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails> {
        let request = self.client.get(self.url(&format!("/zones/{zone_id}")));
        let envelope: ApiResponse<ZoneDetails> = self.send(request, "zone details").await?;

        envelope
            .result
            .ok_or_else(|| Error::provider(PROVIDER, "Invalid response format: missing zone"))
    }

    async fn list_dns_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.get_all_pages(
            &format!("/zones/{zone_id}/dns_records"),
            RECORDS_PER_PAGE,
            "DNS record listing",
        )
        .await
    }

    async fn update_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<()> {
        let url = self.url(&format!("/zones/{zone_id}/dns_records/{record_id}"));

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                serde_json::to_string(update)?
            );
            return Ok(());
        }

        let request = self.client.patch(url).json(update);
        let _: ApiResponse<serde_json::Value> = self.send(request, "DNS record update").await?;

        Ok(())
    }

    async fn list_zones(&self) -> Result<Vec<ZoneDetails>> {
        self.get_all_pages("/zones", ZONES_PER_PAGE, "zone listing")
            .await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
