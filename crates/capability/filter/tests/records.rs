use domain::{BssidObservation, DetectionAlert, DetectionEvent, DetectionType, Scope};
use wsm_filter::{Filter, matches_all};

fn beacon() -> BssidObservation {
    BssidObservation {
        bssid: "AA:BB:CC:00:00:01".to_string(),
        ssid: "CorpWifi".to_string(),
        channel: 6,
        security_suite: Some("WPA2-PSK-CCMP".to_string()),
        fingerprint: None,
        signal_dbm: -52,
        observed_at_ms: 1_000,
    }
}

#[test]
fn beacon_fields_support_numeric_and_regex_filters() {
    let filters = vec![
        Filter::parse("channel", "smaller_than", "14").expect("filter"),
        Filter::parse("signal_dbm", "greater_than", "-60").expect("filter"),
        Filter::parse("bssid", "regex_match", "^AA:BB:CC").expect("filter"),
    ];
    assert!(matches_all(&filters, &beacon()));

    let missing = Filter::parse("fingerprint", "equals", "abc").expect("filter");
    assert!(!missing.matches(&beacon()));
}

#[test]
fn alert_details_are_addressable() {
    let alert = DetectionAlert::activate(&DetectionEvent {
        detection_type: DetectionType::Dot11MonitorChannel,
        scope: Scope::global(),
        subject_key: "AA:BB:CC:00:00:01".to_string(),
        details: serde_json::json!({"channel": 13, "observed": {"source": "10.0.0.7"}}),
        observed_at_ms: 1_000,
        monitored_ssid_uuid: None,
    });
    let filters = vec![
        Filter::parse("detection_type", "equals", "DOT11_MONITOR_CHANNEL").expect("filter"),
        Filter::parse("details.channel", "equals_numeric", "13").expect("filter"),
        Filter::parse("details.observed.source", "is_private", "").expect("filter"),
        Filter::parse("occurrence_count", "equals_numeric", "1").expect("filter"),
    ];
    assert!(matches_all(&filters, &alert));
}
