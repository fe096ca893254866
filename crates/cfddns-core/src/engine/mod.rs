//! Core DDNS engine
//!
//! The DdnsEngine is responsible for:
//! - Resolving the public IP once per cycle via PublicIpSource
//! - Walking every configured zone in order
//! - Comparing each target A record against the public IP
//! - Updating drifted records via DnsGateway
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ PublicIpSource │─── ip ───┐
//! └────────────────┘          │
//!                             ▼
//!                    ┌──────────────┐        ┌─────────────┐
//!                    │  DdnsEngine  │─ ─ ─ ─▶│   Events    │
//!                    └──────────────┘        │  (notify)   │
//!                             │              └─────────────┘
//!             per zone ─▶ per record
//!                             │
//!                             ▼
//!                    ┌──────────────┐
//!                    │  DnsGateway  │
//!                    │ (read/write) │
//!                    └──────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Resolve the public IP; on failure or empty answer, skip to the sleep
//! 2. For each zone, fetch its apex domain; on failure, skip the zone
//! 3. Target the explicit records, or the apex record when none are configured
//! 4. For each target, find its A record; skip on error or when missing
//! 5. Leave matching records alone, update the rest
//! 6. Sleep for the refresh interval
//!
//! Failures never escape a cycle: the next cycle is the only retry.

use crate::config::{DdnsConfig, ZoneConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsGateway, PublicIpSource, RecordType, RecordUpdate};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Capacity of the engine event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        zones_count: usize,
    },

    /// A reconciliation cycle began
    CycleStarted {
        cycle: u64,
    },

    /// Public IP resolved for this cycle
    IpResolved {
        ip: String,
    },

    /// Public IP could not be resolved; the cycle does no update work
    ResolutionFailed {
        error: String,
    },

    /// Zone details could not be fetched; the zone is skipped
    ZoneFailed {
        zone_id: String,
        error: String,
    },

    /// No A record with the target name exists in the zone
    RecordNotFound {
        zone_id: String,
        record_name: String,
    },

    /// Record already points at the public IP
    RecordUnchanged {
        zone_id: String,
        record_name: String,
        ip: String,
    },

    /// Record content was replaced
    RecordUpdated {
        zone_id: String,
        record_name: String,
        previous_ip: String,
        new_ip: String,
    },

    /// Record lookup or update failed; the record is skipped
    RecordFailed {
        zone_id: String,
        record_name: String,
        error: String,
    },

    /// A reconciliation cycle finished
    CycleCompleted {
        cycle: u64,
        report: CycleReport,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Summary of a single reconciliation cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Public IP used for the cycle, `None` when resolution failed
    pub public_ip: Option<String>,
    /// Zones whose details could not be fetched
    pub zones_failed: usize,
    /// Records whose content was replaced
    pub records_updated: usize,
    /// Records already pointing at the public IP
    pub records_unchanged: usize,
    /// Targets with no matching A record
    pub records_not_found: usize,
    /// Records whose lookup or update failed
    pub records_failed: usize,
}

impl CycleReport {
    /// Whether any zone or record failed during the cycle
    pub fn has_failures(&self) -> bool {
        self.public_ip.is_none() || self.zones_failed > 0 || self.records_failed > 0
    }
}

/// Outcome of reconciling a single record
enum RecordOutcome {
    Updated { previous_ip: String },
    Unchanged,
    NotFound,
    Failed(Error),
}

/// Core DDNS engine
///
/// The engine runs the reconciliation loop: one pass over every configured
/// zone per refresh interval, forever, until a shutdown signal arrives.
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`], or drive single passes with
///    [`DdnsEngine::run_cycle()`]
/// 3. Engine runs until shutdown signal received
///
/// ## Threading
///
/// Zones and records are processed strictly sequentially on the calling
/// task. Log context (zone id, zone name, record name) travels in
/// `tracing` spans, never in shared state.
pub struct DdnsEngine {
    /// Source of the public IP
    ip_source: Box<dyn PublicIpSource>,

    /// DNS provider gateway
    gateway: Box<dyn DnsGateway>,

    /// Zones to reconcile, in configured order
    zones: Vec<ZoneConfig>,

    /// Delay between the end of one cycle and the start of the next
    refresh_interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `ip_source`: Public IP source implementation
    /// - `gateway`: DNS gateway implementation
    /// - `config`: DDNS configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events.
    /// Fails if the configuration is invalid, notably if the refresh interval
    /// does not parse.
    pub fn new(
        ip_source: Box<dyn PublicIpSource>,
        gateway: Box<dyn DnsGateway>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;
        let refresh_interval = config.refresh_interval()?;

        for zone in config.zones.iter().filter(|zone| zone.ipv6) {
            warn!(
                zone_id = %zone.zone_id,
                "ipv6 is set but AAAA records are not managed yet; only the A record will be updated"
            );
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            ip_source,
            gateway,
            zones: config.zones,
            refresh_interval,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The interval slept between cycles
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Run the engine
    ///
    /// Runs reconciliation cycles until Ctrl-C is received.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine until the given oneshot fires (or its sender is dropped)
    ///
    /// With `None`, behaves like [`DdnsEngine::run()`].
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            zones_count: self.zones.len(),
        });
        info!(
            "Starting reconciliation loop: {} zone(s), refresh interval {:?}",
            self.zones.len(),
            self.refresh_interval
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut cycle: u64 = 0;

        loop {
            cycle += 1;
            self.emit_event(EngineEvent::CycleStarted { cycle });

            let report = self.run_cycle().await;
            debug!(cycle, ?report, "Reconciliation cycle finished");
            self.emit_event(EngineEvent::CycleCompleted { cycle, report });

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }

                _ = tokio::time::sleep(self.refresh_interval) => {}
            }
        }

        info!("Engine stopped after {} cycle(s)", cycle);
        Ok(())
    }

    /// Run one reconciliation cycle over every configured zone
    ///
    /// Never fails: every error is logged, counted in the returned report,
    /// and reported as an event.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let ip = match self.ip_source.current().await {
            Ok(ip) if ip.is_empty() => {
                warn!(
                    "{} returned no usable public IP, skipping updates this cycle",
                    self.ip_source.source_name()
                );
                self.emit_event(EngineEvent::ResolutionFailed {
                    error: "no IP address in response".to_string(),
                });
                return report;
            }
            Ok(ip) => ip,
            Err(e) => {
                error!("Cannot get public IP: {}", e);
                self.emit_event(EngineEvent::ResolutionFailed {
                    error: e.to_string(),
                });
                return report;
            }
        };

        debug!("Retrieved public IP: {}", ip);
        self.emit_event(EngineEvent::IpResolved { ip: ip.clone() });

        // TODO: check and update zones concurrently
        for zone in &self.zones {
            let span = info_span!("zone", zone_id = %zone.zone_id);
            self.reconcile_zone(zone, &ip, &mut report)
                .instrument(span)
                .await;
        }

        report.public_ip = Some(ip);
        report
    }

    /// Reconcile every target record of one zone
    async fn reconcile_zone(&self, zone: &ZoneConfig, ip: &str, report: &mut CycleReport) {
        info!("Checking A record(s)");

        let details = match self.gateway.zone_details(&zone.zone_id).await {
            Ok(details) => details,
            Err(e) => {
                error!("Cannot get zone details: {}", e);
                report.zones_failed += 1;
                self.emit_event(EngineEvent::ZoneFailed {
                    zone_id: zone.zone_id.clone(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let zone_span = info_span!("zone_records", zone_name = %details.name);
        async {
            debug!("Retrieved zone information successfully");

            for record_name in zone.target_names(&details.name) {
                let record_span = info_span!("record", record = %record_name);
                let outcome = self
                    .reconcile_record(zone, &record_name, ip)
                    .instrument(record_span)
                    .await;

                match outcome {
                    RecordOutcome::Updated { previous_ip } => {
                        report.records_updated += 1;
                        self.emit_event(EngineEvent::RecordUpdated {
                            zone_id: zone.zone_id.clone(),
                            record_name,
                            previous_ip,
                            new_ip: ip.to_string(),
                        });
                    }
                    RecordOutcome::Unchanged => {
                        report.records_unchanged += 1;
                        self.emit_event(EngineEvent::RecordUnchanged {
                            zone_id: zone.zone_id.clone(),
                            record_name,
                            ip: ip.to_string(),
                        });
                    }
                    RecordOutcome::NotFound => {
                        report.records_not_found += 1;
                        self.emit_event(EngineEvent::RecordNotFound {
                            zone_id: zone.zone_id.clone(),
                            record_name,
                        });
                    }
                    RecordOutcome::Failed(e) => {
                        report.records_failed += 1;
                        self.emit_event(EngineEvent::RecordFailed {
                            zone_id: zone.zone_id.clone(),
                            record_name,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
        .instrument(zone_span)
        .await;
    }

    /// Compare one record against the public IP and update it if it drifted
    async fn reconcile_record(&self, zone: &ZoneConfig, record_name: &str, ip: &str) -> RecordOutcome {
        let record = match self
            .gateway
            .find_record(&zone.zone_id, RecordType::A, record_name)
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!("A record not found in zone listing, skipping");
                return RecordOutcome::NotFound;
            }
            Err(e) => {
                error!("Cannot get A record: {}", e);
                return RecordOutcome::Failed(e);
            }
        };
        debug!("Retrieved A record successfully");

        if record.content == ip {
            info!("Record contains the same current public IP, skipping update");
            return RecordOutcome::Unchanged;
        }

        let update = RecordUpdate::a(&record.name, ip, zone.proxied);
        if let Err(e) = self
            .gateway
            .update_dns_record(&zone.zone_id, &record.id, &update)
            .await
        {
            error!("Cannot update A record: {}", e);
            return RecordOutcome::Failed(e);
        }

        info!(
            "A record updated successfully, old IP {} was replaced with new IP {}",
            record.content, ip
        );
        RecordOutcome::Updated {
            previous_ip: record.content,
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Nobody is listening; events are optional.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
