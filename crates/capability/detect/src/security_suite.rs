//! 安全套件变化：已知 BSSID 广播的套件不在基线中（降级与平移都会上报）。

use crate::{DetectionContext, Detector, DetectorError, policy_event};
use domain::{DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid};
use serde_json::json;
use std::collections::BTreeSet;

const OPEN_SUITE: &str = "NONE";

pub(crate) struct UnexpectedSecuritySuite;

/// 安全套件强度：开放 0、WEP 1、WPA 2、WPA2 3、WPA3/SAE 4。
pub fn suite_strength(suite: &str) -> u8 {
    let suite = suite.to_ascii_uppercase();
    if suite.contains("WPA3") || suite.contains("SAE") || suite.contains("OWE") {
        4
    } else if suite.contains("WPA2") || suite.contains("RSN") {
        3
    } else if suite.contains("WPA") {
        2
    } else if suite.contains("WEP") {
        1
    } else {
        0
    }
}

impl Detector for UnexpectedSecuritySuite {
    fn kind(&self) -> DetectorKind {
        DetectorKind::UnexpectedSecuritySuite
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11MonitorSecuritySuite
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let baseline = ctx.require_baseline("unexpected_security_suite")?;
        let mut reported = BTreeSet::new();
        let mut events = Vec::new();
        for beacon in batch.beacons_for_ssid(&policy.ssid) {
            let Some(known) = baseline.bssid(&beacon.bssid) else {
                continue;
            };
            if known.security_suites.is_empty() {
                continue;
            }
            let observed = beacon.security_suite.as_deref().unwrap_or(OPEN_SUITE);
            if known.security_suites.contains(observed) {
                continue;
            }
            if !reported.insert((beacon.bssid.as_str(), observed)) {
                continue;
            }
            let weakest_expected = known
                .security_suites
                .iter()
                .map(|suite| suite_strength(suite))
                .min()
                .unwrap_or(0);
            let downgrade = suite_strength(observed) < weakest_expected;
            events.push(policy_event(
                batch,
                policy,
                self.detection_type(),
                beacon.bssid.clone(),
                json!({
                    "ssid": policy.ssid,
                    "bssid": beacon.bssid,
                    "baseline_suites": known.security_suites,
                    "observed_suite": observed,
                    "downgrade": downgrade,
                }),
                beacon.observed_at_ms,
            ));
        }
        Ok(events)
    }
}
