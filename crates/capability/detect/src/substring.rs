//! 禁用子串：观测到的 SSID 包含策略配置的禁用子串（不区分大小写）。

use crate::{DetectionContext, Detector, DetectorError, policy_event};
use domain::{
    DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid, sanitize_ssid,
};
use serde_json::json;
use std::collections::BTreeMap;

pub(crate) struct SsidSubstring;

impl Detector for SsidSubstring {
    fn kind(&self) -> DetectorKind {
        DetectorKind::SsidSubstring
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11MonitorSsidSubstring
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        _ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let substrings: Vec<String> = policy
            .ssid_substrings
            .iter()
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect();
        if substrings.is_empty() {
            return Err(DetectorError::Configuration {
                detector: "ssid_substring",
                reason: "no substrings configured".to_string(),
            });
        }

        let mut matches: BTreeMap<String, (String, &str, i64)> = BTreeMap::new();
        for beacon in &batch.beacons {
            let ssid = sanitize_ssid(&beacon.ssid);
            if ssid.is_empty() || ssid == policy.ssid || matches.contains_key(&ssid) {
                continue;
            }
            let lowered = ssid.to_lowercase();
            if let Some(substring) = substrings.iter().find(|item| lowered.contains(item.as_str())) {
                matches.insert(
                    ssid,
                    (substring.clone(), beacon.bssid.as_str(), beacon.observed_at_ms),
                );
            }
        }

        Ok(matches
            .into_iter()
            .map(|(ssid, (substring, bssid, observed_at_ms))| {
                policy_event(
                    batch,
                    policy,
                    self.detection_type(),
                    ssid.clone(),
                    json!({
                        "monitored_ssid": policy.ssid,
                        "observed_ssid": ssid,
                        "substring": substring,
                        "bssid": bssid,
                    }),
                    observed_at_ms,
                )
            })
            .collect())
    }
}
