//! 租户级检测：敌对设备接触、监控的探测请求、未批准 SSID。
//!
//! 这些检测不依附于单个监控策略，输入是租户观察名单；
//! 匹配任一放行条件的观测、以及带 MAC 注解的客户端不会产生事件。

use domain::{DetectionEvent, DetectionType, Dot11Batch, normalize_mac, sanitize_ssid};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;
use wsm_filter::{Filter, FilterError, Filterable, matches_any};
use wsm_storage::{AllowFilter, TenantWatchlist};

/// 租户级检测输入。
pub struct WatchlistInput<'a> {
    pub watchlist: &'a TenantWatchlist,
    pub allow_filters: &'a [Filter],
    pub known_macs: &'a BTreeSet<String>,
    /// 所有覆盖该租户的监控策略的 SSID。
    pub monitored_ssids: &'a BTreeSet<String>,
    /// 所有受保护 SSID 基线中的 BSSID。
    pub monitored_bssids: &'a BTreeSet<String>,
}

impl WatchlistInput<'_> {
    fn allowed(&self, record: &dyn Filterable) -> bool {
        matches_any(self.allow_filters, record)
    }
}

/// 解析放行条件；非法条件逐条返回错误，不影响其余条件。
pub fn parse_allow_filters(filters: &[AllowFilter]) -> (Vec<Filter>, Vec<FilterError>) {
    let mut parsed = Vec::with_capacity(filters.len());
    let mut errors = Vec::new();
    for filter in filters {
        match Filter::parse(&filter.field, &filter.operator, &filter.value) {
            Ok(filter) => parsed.push(filter),
            Err(err) => {
                warn!(target: "wsm.detect", error = %err, "allow_filter_invalid");
                errors.push(err);
            }
        }
    }
    (parsed, errors)
}

fn event(
    batch: &Dot11Batch,
    detection_type: DetectionType,
    subject_key: String,
    details: serde_json::Value,
    observed_at_ms: i64,
) -> DetectionEvent {
    DetectionEvent {
        detection_type,
        scope: batch.scope(),
        subject_key,
        details,
        observed_at_ms,
        monitored_ssid_uuid: None,
    }
}

/// 运行全部租户级检测。
pub fn run_watchlist_detectors(
    batch: &Dot11Batch,
    input: &WatchlistInput<'_>,
) -> Vec<DetectionEvent> {
    let mut events = bandit_contacts(batch, input);
    events.extend(monitored_probe_requests(batch, input));
    events.extend(unapproved_ssids(batch, input));
    events
}

fn bandit_contacts(batch: &Dot11Batch, input: &WatchlistInput<'_>) -> Vec<DetectionEvent> {
    let mut contacts = BTreeMap::new();
    for beacon in &batch.beacons {
        let Some(fingerprint) = beacon.fingerprint.as_deref() else {
            continue;
        };
        if input.allowed(beacon) {
            continue;
        }
        for bandit in &input.watchlist.bandits {
            if bandit.fingerprints.contains(fingerprint) {
                contacts.entry(bandit.uuid).or_insert((bandit, beacon));
            }
        }
    }
    contacts
        .into_values()
        .map(|(bandit, beacon)| {
            event(
                batch,
                DetectionType::Dot11BanditContact,
                bandit.uuid.to_string(),
                json!({
                    "bandit_name": bandit.name,
                    "fingerprint": beacon.fingerprint,
                    "bssid": beacon.bssid,
                    "ssid": beacon.ssid,
                    "signal_dbm": beacon.signal_dbm,
                }),
                beacon.observed_at_ms,
            )
        })
        .collect()
}

fn monitored_probe_requests(batch: &Dot11Batch, input: &WatchlistInput<'_>) -> Vec<DetectionEvent> {
    if input.watchlist.monitored_probe_ssids.is_empty() {
        return Vec::new();
    }
    let mut probes: BTreeMap<String, (BTreeSet<String>, i64)> = BTreeMap::new();
    for probe in &batch.probe_requests {
        let ssid = sanitize_ssid(&probe.ssid);
        if !input.watchlist.monitored_probe_ssids.contains(&ssid) {
            continue;
        }
        let Some(mac) = normalize_mac(&probe.client_mac) else {
            continue;
        };
        if input.known_macs.contains(&mac) || input.allowed(probe) {
            continue;
        }
        let entry = probes.entry(ssid).or_insert_with(|| (BTreeSet::new(), 0));
        entry.0.insert(mac);
        entry.1 = entry.1.max(probe.observed_at_ms);
    }
    probes
        .into_iter()
        .map(|(ssid, (clients, observed_at_ms))| {
            event(
                batch,
                DetectionType::Dot11Probereq,
                ssid.clone(),
                json!({"ssid": ssid, "client_macs": clients}),
                observed_at_ms,
            )
        })
        .collect()
}

fn unapproved_ssids(batch: &Dot11Batch, input: &WatchlistInput<'_>) -> Vec<DetectionEvent> {
    if input.monitored_bssids.is_empty() {
        return Vec::new();
    }
    let mut found: BTreeMap<String, (BTreeSet<String>, i64)> = BTreeMap::new();
    for beacon in &batch.beacons {
        if !input.monitored_bssids.contains(&beacon.bssid) {
            continue;
        }
        let ssid = sanitize_ssid(&beacon.ssid);
        if ssid.is_empty()
            || input.monitored_ssids.contains(&ssid)
            || input.watchlist.approved_ssids.contains(&ssid)
            || input.allowed(beacon)
        {
            continue;
        }
        let entry = found.entry(ssid).or_insert_with(|| (BTreeSet::new(), 0));
        entry.0.insert(beacon.bssid.clone());
        entry.1 = entry.1.max(beacon.observed_at_ms);
    }
    found
        .into_iter()
        .map(|(ssid, (bssids, observed_at_ms))| {
            event(
                batch,
                DetectionType::Dot11UnapprovedSsid,
                ssid.clone(),
                json!({"ssid": ssid, "bssids": bssids}),
                observed_at_ms,
            )
        })
        .collect()
}
