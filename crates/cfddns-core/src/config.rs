//! Configuration types for the DDNS updater
//!
//! The configuration is a single YAML document loaded once at startup and
//! treated as immutable for the lifetime of the reconciliation loop.
//!
//! ```yaml
//! api_token: "..."
//! refresh_interval: "5m"
//! zones:
//!   - zone_id: "023e105f4ecef8ad9ca31a8372d0c353"
//!     proxied: false
//!     explicit_records:
//!       - name: www
//! ```

use crate::duration::parse_positive_duration;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name, used for the config search directories
pub const APP_NAME: &str = "cloudflare-ddns";

/// Environment variable that overrides `api_token` from the file
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_DDNS_API_TOKEN";

/// File names probed in each search directory, in order
const CONFIG_FILE_NAMES: &[&str] = &["config.yaml", "config.yml"];

/// Main DDNS configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    pub api_token: String,

    /// Interval between reconciliation cycles, e.g. "30s" or "5m"
    pub refresh_interval: String,

    /// Upper bound for every outgoing HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,

    /// Readiness probe settings
    #[serde(default)]
    pub health: HealthConfig,

    /// Zones to reconcile, processed in this order
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("api_token", &"<REDACTED>")
            .field("refresh_interval", &self.refresh_interval)
            .field("request_timeout", &self.request_timeout)
            .field("health", &self.health)
            .field("zones", &self.zones)
            .finish()
    }
}

impl DdnsConfig {
    /// Create a configuration with the given token and interval and no zones
    pub fn new(api_token: impl Into<String>, refresh_interval: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            refresh_interval: refresh_interval.into(),
            request_timeout: default_request_timeout(),
            health: HealthConfig::default(),
            zones: Vec::new(),
        }
    }

    /// Add a zone
    pub fn with_zone(mut self, zone: ZoneConfig) -> Self {
        self.zones.push(zone);
        self
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a configuration from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Search the default locations and load the first file found
    ///
    /// Returns the loaded config together with the path it came from.
    pub fn discover() -> Result<(Self, PathBuf)> {
        let dirs = default_search_dirs();
        let path = find_config_file(&dirs)?;
        let config = Self::load(&path)?;
        Ok((config, path))
    }

    /// Replace the token with the value of [`API_TOKEN_ENV`] when it is set
    pub fn apply_env_overrides(&mut self) {
        self.override_token(std::env::var(API_TOKEN_ENV).ok());
    }

    fn override_token(&mut self, token: Option<String>) {
        if let Some(token) = token
            && !token.trim().is_empty()
        {
            self.api_token = token.trim().to_string();
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(Error::config("api_token cannot be empty"));
        }

        self.refresh_interval()?;
        self.request_timeout()?;

        for (index, zone) in self.zones.iter().enumerate() {
            zone.validate()
                .map_err(|e| Error::config(format!("zones[{index}]: {e}")))?;
        }

        Ok(())
    }

    /// The parsed refresh interval
    pub fn refresh_interval(&self) -> Result<Duration> {
        parse_positive_duration(&self.refresh_interval).map_err(|e| {
            Error::config(format!(
                "cannot parse refresh_interval, specify an interval like 500ms, 10s or 5m ({e})"
            ))
        })
    }

    /// The parsed request timeout
    pub fn request_timeout(&self) -> Result<Duration> {
        parse_positive_duration(&self.request_timeout)
            .map_err(|e| Error::config(format!("cannot parse request_timeout ({e})")))
    }
}

/// Readiness probe configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Whether to serve the probe endpoints at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Address the probe server listens on
    #[serde(default = "default_health_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen_addr: default_health_addr(),
        }
    }
}

/// A Cloudflare zone to keep up to date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Opaque Cloudflare zone identifier
    pub zone_id: String,

    /// Whether updated records are proxied through Cloudflare
    #[serde(default)]
    pub proxied: bool,

    /// Reserved: AAAA records are not managed yet
    #[serde(default)]
    pub ipv6: bool,

    /// Subdomain records to manage instead of the zone apex
    #[serde(default)]
    pub explicit_records: Vec<RecordConfig>,
}

impl ZoneConfig {
    /// Create a zone that targets its apex record
    pub fn new(zone_id: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            proxied: false,
            ipv6: false,
            explicit_records: Vec::new(),
        }
    }

    /// Set the proxied flag forwarded on updates
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    /// Add an explicit subdomain record
    pub fn with_record(mut self, name: impl Into<String>) -> Self {
        self.explicit_records.push(RecordConfig::new(name));
        self
    }

    /// Whether explicit records replace apex targeting for this zone
    pub fn contains_explicit_records(&self) -> bool {
        !self.explicit_records.is_empty()
    }

    /// Fully-qualified names to reconcile for a zone whose apex is `apex`
    ///
    /// Explicit records and the apex record are mutually exclusive: when
    /// any explicit record is configured the apex is never returned.
    pub fn target_names(&self, apex: &str) -> Vec<String> {
        if self.contains_explicit_records() {
            self.explicit_records
                .iter()
                .map(|record| record.fqdn(apex))
                .collect()
        } else {
            vec![apex.to_string()]
        }
    }

    fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.zone_id.trim().is_empty() {
            return Err("zone_id cannot be empty");
        }
        if self.explicit_records.iter().any(|r| r.name.trim().is_empty()) {
            return Err("explicit record name cannot be empty");
        }
        Ok(())
    }
}

/// A subdomain record, relative to its zone apex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Subdomain label, e.g. "www" or "vpn.office"
    pub name: String,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Fully-qualified name of this record under `apex`
    pub fn fqdn(&self, apex: &str) -> String {
        format!("{}.{}", self.name, apex)
    }
}

/// Directories searched for a config file, highest priority first:
/// `/etc/cloudflare-ddns`, `$HOME/.cloudflare-ddns`, then the working directory.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut search = vec![PathBuf::from("/etc").join(APP_NAME)];
    if let Some(home) = dirs::home_dir() {
        search.push(home.join(format!(".{APP_NAME}")));
    }
    search.push(PathBuf::from("."));
    search
}

/// Return the first existing config file under `dirs`
pub fn find_config_file(dirs: &[PathBuf]) -> Result<PathBuf> {
    let mut searched = Vec::with_capacity(dirs.len() * CONFIG_FILE_NAMES.len());

    for dir in dirs {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
    }

    Err(Error::ConfigNotFound { searched })
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_health_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8086))
}
