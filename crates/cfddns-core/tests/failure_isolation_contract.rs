//! Contract Test: Failure Isolation
//!
//! This test verifies that failures stay contained at the level they occur.
//!
//! Constraints verified:
//! - A failed public IP resolution skips the cycle without touching the gateway
//! - An empty resolver answer is treated as "no usable IP"
//! - A zone whose details cannot be fetched does not block other zones
//! - A record whose lookup or update fails does not block other records
//! - A missing record is a distinct, non-failing outcome
//!
//! If this test fails, one broken zone can starve the others.

mod common;

use cfddns_core::config::ZoneConfig;
use cfddns_core::{DdnsEngine, EngineEvent};
use common::*;

#[tokio::test]
async fn resolution_failure_skips_all_gateway_work() {
    let ip_source = ScriptedIpSource::failing("connection refused");
    let gateway = MockGateway::new()
        .with_zone("zone-1", "example.com")
        .with_record("zone-1", "rec-apex", "A", "example.com", "1.2.3.4");

    let config = config_with_zones(vec![ZoneConfig::new("zone-1")]);
    let (engine, mut event_rx) =
        DdnsEngine::new(Box::new(ip_source), Box::new(gateway.clone()), config)
            .expect("engine construction succeeds");

    let report = engine.run_cycle().await;

    assert!(report.public_ip.is_none());
    assert!(gateway.zone_detail_calls().is_empty());
    assert_eq!(gateway.update_call_count(), 0);
    assert!(matches!(
        event_rx.try_recv(),
        Ok(EngineEvent::ResolutionFailed { .. })
    ));
}

#[tokio::test]
async fn empty_public_ip_is_not_written_to_records() {
    let ip_source = ScriptedIpSource::fixed("");
    let gateway = MockGateway::new()
        .with_zone("zone-1", "example.com")
        .with_record("zone-1", "rec-apex", "A", "example.com", "1.2.3.4");

    let config = config_with_zones(vec![ZoneConfig::new("zone-1")]);
    let (engine, _event_rx) =
        DdnsEngine::new(Box::new(ip_source), Box::new(gateway.clone()), config)
            .expect("engine construction succeeds");

    let report = engine.run_cycle().await;

    assert!(report.public_ip.is_none());
    assert_eq!(gateway.update_call_count(), 0);
    assert_eq!(gateway.content_of("zone-1", "rec-apex").as_deref(), Some("1.2.3.4"));
}

#[tokio::test]
async fn resolver_recovers_on_the_next_cycle() {
    let ip_source = ScriptedIpSource::scripted(vec![
        Err("timeout".to_string()),
        Ok("5.6.7.8".to_string()),
    ]);
    let gateway = MockGateway::new()
        .with_zone("zone-1", "example.com")
        .with_record("zone-1", "rec-apex", "A", "example.com", "1.2.3.4");

    let config = config_with_zones(vec![ZoneConfig::new("zone-1")]);
    let (engine, _event_rx) =
        DdnsEngine::new(Box::new(ip_source), Box::new(gateway.clone()), config)
            .expect("engine construction succeeds");

    let first = engine.run_cycle().await;
    let second = engine.run_cycle().await;

    assert!(first.public_ip.is_none());
    assert_eq!(second.records_updated, 1);
    assert_eq!(gateway.content_of("zone-1", "rec-apex").as_deref(), Some("5.6.7.8"));
}

#[tokio::test]
async fn failing_zone_does_not_block_following_zone() {
    let ip_source = ScriptedIpSource::fixed("5.6.7.8");
    let gateway = MockGateway::new()
        .with_zone("zone-a", "a.example")
        .with_record("zone-a", "rec-a", "A", "a.example", "1.2.3.4")
        .failing_zone("zone-a")
        .with_zone("zone-b", "b.example")
        .with_record("zone-b", "rec-b", "A", "b.example", "1.2.3.4");

    let config = config_with_zones(vec![ZoneConfig::new("zone-a"), ZoneConfig::new("zone-b")]);
    let (engine, _event_rx) =
        DdnsEngine::new(Box::new(ip_source), Box::new(gateway.clone()), config)
            .expect("engine construction succeeds");

    let report = engine.run_cycle().await;

    assert_eq!(report.zones_failed, 1);
    assert_eq!(report.records_updated, 1);
    assert_eq!(gateway.content_of("zone-b", "rec-b").as_deref(), Some("5.6.7.8"));
    assert_eq!(gateway.content_of("zone-a", "rec-a").as_deref(), Some("1.2.3.4"));
}

#[tokio::test]
async fn failing_record_listing_is_isolated_to_its_zone() {
    let ip_source = ScriptedIpSource::fixed("5.6.7.8");
    let gateway = MockGateway::new()
        .with_zone("zone-a", "a.example")
        .failing_listing("zone-a")
        .with_zone("zone-b", "b.example")
        .with_record("zone-b", "rec-b", "A", "b.example", "1.2.3.4");

    let zone_a = ZoneConfig::new("zone-a").with_record("www").with_record("vpn");
    let config = config_with_zones(vec![zone_a, ZoneConfig::new("zone-b")]);
    let (engine, _event_rx) =
        DdnsEngine::new(Box::new(ip_source), Box::new(gateway.clone()), config)
            .expect("engine construction succeeds");

    let report = engine.run_cycle().await;

    // both explicit records in zone-a were attempted and failed independently
    assert_eq!(report.records_failed, 2);
    assert_eq!(report.records_updated, 1);
    assert_eq!(gateway.content_of("zone-b", "rec-b").as_deref(), Some("5.6.7.8"));
}

#[tokio::test]
async fn failing_update_does_not_block_sibling_records() {
    let ip_source = ScriptedIpSource::fixed("5.6.7.8");
    let gateway = MockGateway::new()
        .with_zone("zone-1", "example.com")
        .with_record("zone-1", "rec-www", "A", "www.example.com", "1.2.3.4")
        .with_record("zone-1", "rec-vpn", "A", "vpn.example.com", "1.2.3.4")
        .failing_update("rec-www");

    let zone = ZoneConfig::new("zone-1").with_record("www").with_record("vpn");
    let config = config_with_zones(vec![zone]);
    let (engine, _event_rx) =
        DdnsEngine::new(Box::new(ip_source), Box::new(gateway.clone()), config)
            .expect("engine construction succeeds");

    let report = engine.run_cycle().await;

    assert_eq!(report.records_failed, 1);
    assert_eq!(report.records_updated, 1);
    assert_eq!(gateway.content_of("zone-1", "rec-www").as_deref(), Some("1.2.3.4"));
    assert_eq!(gateway.content_of("zone-1", "rec-vpn").as_deref(), Some("5.6.7.8"));
}

#[tokio::test]
async fn missing_record_is_reported_but_not_a_failure() {
    let ip_source = ScriptedIpSource::fixed("5.6.7.8");
    let gateway = MockGateway::new()
        .with_zone("zone-1", "example.com")
        .with_record("zone-1", "rec-www", "A", "www.example.com", "1.2.3.4");

    // "wwww" is a typo: no such record exists
    let zone = ZoneConfig::new("zone-1").with_record("wwww").with_record("www");
    let config = config_with_zones(vec![zone]);
    let (engine, mut event_rx) =
        DdnsEngine::new(Box::new(ip_source), Box::new(gateway.clone()), config)
            .expect("engine construction succeeds");

    let report = engine.run_cycle().await;

    assert_eq!(report.records_not_found, 1);
    assert_eq!(report.records_updated, 1);
    assert!(!report.has_failures());

    let mut saw_not_found = false;
    while let Ok(event) = event_rx.try_recv() {
        if let EngineEvent::RecordNotFound { record_name, .. } = event {
            assert_eq!(record_name, "wwww.example.com");
            saw_not_found = true;
        }
    }
    assert!(saw_not_found, "RecordNotFound event expected");
}
