//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles keep their state behind `Arc`s, so a test can hand one clone
//! to the engine and keep another to inspect calls afterwards.

#![allow(dead_code)]

use cfddns_core::config::{DdnsConfig, ZoneConfig};
use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{DnsGateway, DnsRecord, PublicIpSource, RecordUpdate, ZoneDetails};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// An IP source that replays a script of answers, repeating the last one
#[derive(Clone)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    last: Arc<Mutex<std::result::Result<String, String>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedIpSource {
    /// Always answer with `ip`
    pub fn fixed(ip: &str) -> Self {
        Self::scripted(vec![Ok(ip.to_string())])
    }

    /// Always fail
    pub fn failing(message: &str) -> Self {
        Self::scripted(vec![Err(message.to_string())])
    }

    /// Answer with each entry in turn, then keep repeating the last one
    pub fn scripted(answers: Vec<std::result::Result<String, String>>) -> Self {
        let mut script: VecDeque<_> = answers.into();
        let last = script
            .pop_back()
            .expect("script must contain at least one answer");
        Self {
            script: Arc::new(Mutex::new(script)),
            last: Arc::new(Mutex::new(last)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times current() was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Instants at which current() was called
    pub fn call_instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PublicIpSource for ScriptedIpSource {
    async fn current(&self) -> Result<String> {
        self.calls.lock().unwrap().push(Instant::now());

        let answer = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.lock().unwrap().clone());

        answer.map_err(Error::resolution)
    }

    async fn probe(&self) -> Result<()> {
        self.last
            .lock()
            .unwrap()
            .clone()
            .map(|_| ())
            .map_err(Error::resolution)
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// An in-memory DNS gateway that records every call
#[derive(Clone, Default)]
pub struct MockGateway {
    apexes: Arc<Mutex<HashMap<String, String>>>,
    records: Arc<Mutex<HashMap<String, Vec<DnsRecord>>>>,
    failing_zones: Arc<Mutex<HashSet<String>>>,
    failing_listings: Arc<Mutex<HashSet<String>>>,
    failing_updates: Arc<Mutex<HashSet<String>>>,
    zone_detail_calls: Arc<Mutex<Vec<String>>>,
    list_call_count: Arc<AtomicUsize>,
    updates: Arc<Mutex<Vec<(String, String, RecordUpdate)>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone with its apex domain
    pub fn with_zone(self, zone_id: &str, apex: &str) -> Self {
        self.apexes
            .lock()
            .unwrap()
            .insert(zone_id.to_string(), apex.to_string());
        self.records
            .lock()
            .unwrap()
            .entry(zone_id.to_string())
            .or_default();
        self
    }

    /// Add a record to a zone's listing
    pub fn with_record(
        self,
        zone_id: &str,
        record_id: &str,
        record_type: &str,
        name: &str,
        content: &str,
    ) -> Self {
        self.records
            .lock()
            .unwrap()
            .entry(zone_id.to_string())
            .or_default()
            .push(DnsRecord {
                id: record_id.to_string(),
                record_type: record_type.to_string(),
                name: name.to_string(),
                content: content.to_string(),
                proxied: false,
                ttl: Some(1),
            });
        self
    }

    /// Make zone_details() fail for a zone
    pub fn failing_zone(self, zone_id: &str) -> Self {
        self.failing_zones
            .lock()
            .unwrap()
            .insert(zone_id.to_string());
        self
    }

    /// Make list_dns_records() fail for a zone
    pub fn failing_listing(self, zone_id: &str) -> Self {
        self.failing_listings
            .lock()
            .unwrap()
            .insert(zone_id.to_string());
        self
    }

    /// Make update_dns_record() fail for a record id
    pub fn failing_update(self, record_id: &str) -> Self {
        self.failing_updates
            .lock()
            .unwrap()
            .insert(record_id.to_string());
        self
    }

    /// Every (zone_id, record_id, update) passed to update_dns_record()
    pub fn updates(&self) -> Vec<(String, String, RecordUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    /// Number of update_dns_record() calls
    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// Zone ids passed to zone_details(), in call order
    pub fn zone_detail_calls(&self) -> Vec<String> {
        self.zone_detail_calls.lock().unwrap().clone()
    }

    /// Number of list_dns_records() calls
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Current content of a record
    pub fn content_of(&self, zone_id: &str, record_id: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(zone_id)?
            .iter()
            .find(|r| r.id == record_id)
            .map(|r| r.content.clone())
    }
}

#[async_trait::async_trait]
impl DnsGateway for MockGateway {
    async fn zone_details(&self, zone_id: &str) -> Result<ZoneDetails> {
        self.zone_detail_calls
            .lock()
            .unwrap()
            .push(zone_id.to_string());

        if self.failing_zones.lock().unwrap().contains(zone_id) {
            return Err(Error::provider("mock", "zone details unavailable"));
        }

        let apex = self
            .apexes
            .lock()
            .unwrap()
            .get(zone_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("zone {zone_id}")))?;

        Ok(ZoneDetails {
            id: zone_id.to_string(),
            name: apex,
        })
    }

    async fn list_dns_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);

        if self.failing_listings.lock().unwrap().contains(zone_id) {
            return Err(Error::provider("mock", "record listing unavailable"));
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .get(zone_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<()> {
        self.updates.lock().unwrap().push((
            zone_id.to_string(),
            record_id.to_string(),
            update.clone(),
        ));

        if self.failing_updates.lock().unwrap().contains(record_id) {
            return Err(Error::provider("mock", "update rejected"));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(zone_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| Error::not_found(format!("record {record_id}")))?;
        record.content = update.content.clone();
        record.proxied = update.proxied;

        Ok(())
    }

    async fn list_zones(&self) -> Result<Vec<ZoneDetails>> {
        Ok(self
            .apexes
            .lock()
            .unwrap()
            .iter()
            .map(|(id, name)| ZoneDetails {
                id: id.clone(),
                name: name.clone(),
            })
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A config with the given zones and a one-minute refresh interval
pub fn config_with_zones(zones: Vec<ZoneConfig>) -> DdnsConfig {
    zones
        .into_iter()
        .fold(DdnsConfig::new("test-token", "1m"), DdnsConfig::with_zone)
}
