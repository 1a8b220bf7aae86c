use domain::{Bandit, BssidObservation, DetectionType, Dot11Batch, ProbeRequestObservation, Scope};
use std::collections::BTreeSet;
use uuid::Uuid;
use wsm_detect::{WatchlistInput, parse_allow_filters, run_watchlist_detectors};
use wsm_storage::{AllowFilter, TenantWatchlist};

fn batch() -> Dot11Batch {
    let scope = Scope::new(Some(Uuid::from_u128(1)), Some(Uuid::from_u128(2)));
    Dot11Batch {
        organization_id: scope.organization_id,
        tenant_id: scope.tenant_id,
        received_at_ms: 1_000,
        ..Dot11Batch::default()
    }
}

fn beacon(bssid: &str, ssid: &str, fingerprint: &str, signal_dbm: i32) -> BssidObservation {
    BssidObservation {
        bssid: bssid.to_string(),
        ssid: ssid.to_string(),
        channel: 6,
        security_suite: None,
        fingerprint: Some(fingerprint.to_string()),
        signal_dbm,
        observed_at_ms: 500,
    }
}

fn probe(mac: &str, ssid: &str) -> ProbeRequestObservation {
    ProbeRequestObservation {
        client_mac: mac.to_string(),
        ssid: ssid.to_string(),
        observed_at_ms: 600,
    }
}

#[test]
fn bandit_contact_respects_allow_filters() {
    let bandit = Bandit {
        uuid: Uuid::from_u128(9),
        name: "pineapple".to_string(),
        fingerprints: BTreeSet::from(["evil-fp".to_string()]),
    };
    let watchlist = TenantWatchlist {
        bandits: vec![bandit],
        ..TenantWatchlist::default()
    };
    let (allow, errors) = parse_allow_filters(&[
        AllowFilter {
            field: "signal_dbm".to_string(),
            operator: "smaller_than".to_string(),
            value: "-90".to_string(),
        },
        AllowFilter {
            field: "ssid".to_string(),
            operator: "contains".to_string(),
            value: "x".to_string(),
        },
    ]);
    assert_eq!(allow.len(), 1);
    assert_eq!(errors.len(), 1);

    let empty = BTreeSet::new();
    let input = WatchlistInput {
        watchlist: &watchlist,
        allow_filters: &allow,
        known_macs: &empty,
        monitored_ssids: &empty,
        monitored_bssids: &empty,
    };

    let mut far = batch();
    far.beacons = vec![beacon("EE:EE:EE:EE:EE:01", "Free", "evil-fp", -95)];
    assert!(run_watchlist_detectors(&far, &input).is_empty());

    let mut near = batch();
    near.beacons = vec![beacon("EE:EE:EE:EE:EE:01", "Free", "evil-fp", -40)];
    let events = run_watchlist_detectors(&near, &input);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].detection_type, DetectionType::Dot11BanditContact);
    assert_eq!(events[0].subject_key, Uuid::from_u128(9).to_string());
}

#[test]
fn probe_requests_from_known_devices_are_suppressed() {
    let watchlist = TenantWatchlist {
        monitored_probe_ssids: BTreeSet::from(["CorpWifi".to_string()]),
        ..TenantWatchlist::default()
    };
    let known = BTreeSet::from(["AA:AA:AA:AA:AA:01".to_string()]);
    let empty = BTreeSet::new();
    let input = WatchlistInput {
        watchlist: &watchlist,
        allow_filters: &[],
        known_macs: &known,
        monitored_ssids: &empty,
        monitored_bssids: &empty,
    };

    let mut only_known = batch();
    only_known.probe_requests = vec![probe("aa:aa:aa:aa:aa:01", "CorpWifi")];
    assert!(run_watchlist_detectors(&only_known, &input).is_empty());

    let mut unknown = batch();
    unknown.probe_requests = vec![
        probe("aa:aa:aa:aa:aa:01", "CorpWifi"),
        probe("bb:bb:bb:bb:bb:02", "CorpWifi"),
        probe("bb:bb:bb:bb:bb:02", "Other"),
    ];
    let events = run_watchlist_detectors(&unknown, &input);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].detection_type, DetectionType::Dot11Probereq);
    assert_eq!(events[0].subject_key, "CorpWifi");
    assert_eq!(events[0].details["client_macs"][0], "BB:BB:BB:BB:BB:02");
}

#[test]
fn monitored_bssid_advertising_unapproved_ssid() {
    let watchlist = TenantWatchlist {
        approved_ssids: BTreeSet::from(["CorpGuest".to_string()]),
        ..TenantWatchlist::default()
    };
    let monitored_ssids = BTreeSet::from(["CorpWifi".to_string()]);
    let monitored_bssids = BTreeSet::from(["AA:AA:AA:AA:AA:01".to_string()]);
    let empty = BTreeSet::new();
    let input = WatchlistInput {
        watchlist: &watchlist,
        allow_filters: &[],
        known_macs: &empty,
        monitored_ssids: &monitored_ssids,
        monitored_bssids: &monitored_bssids,
    };

    let mut batch = batch();
    batch.beacons = vec![
        beacon("AA:AA:AA:AA:AA:01", "CorpWifi", "fp", -50),
        beacon("AA:AA:AA:AA:AA:01", "CorpGuest", "fp", -50),
        beacon("AA:AA:AA:AA:AA:01", "Backdoor", "fp", -50),
        beacon("FF:FF:FF:FF:FF:01", "Elsewhere", "fp", -50),
    ];
    let events = run_watchlist_detectors(&batch, &input);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].detection_type, DetectionType::Dot11UnapprovedSsid);
    assert_eq!(events[0].subject_key, "Backdoor");
}
