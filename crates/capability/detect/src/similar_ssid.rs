//! 相似 SSID：观测到的 SSID 与受保护 SSID 的编辑距离不超过阈值且不完全相同。
//!
//! 距离取原始字符串与折叠常见形近字符后的两者较小值，
//! 因此 `C0rpWifi`、`C0RPW1FI` 以及 rn→m 这类仿冒都会被识别。

use crate::{DetectionContext, Detector, DetectorError, policy_event};
use domain::{
    DetectionEvent, DetectionType, DetectorKind, Dot11Batch, MonitoredSsid, sanitize_ssid,
};
use serde_json::json;
use std::collections::BTreeMap;

/// 字符级 Levenshtein 距离。
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// 折叠形近字符并转小写。
pub fn fold_confusables(ssid: &str) -> String {
    ssid.to_lowercase()
        .replace("rn", "m")
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' => 'l',
            '3' => 'e',
            '5' | '$' => 's',
            '@' => 'a',
            other => other,
        })
        .collect()
}

/// 两个 SSID 的相似距离。
pub fn ssid_distance(a: &str, b: &str) -> usize {
    levenshtein(a, b).min(levenshtein(&fold_confusables(a), &fold_confusables(b)))
}

pub(crate) struct SimilarLookingSsid;

impl Detector for SimilarLookingSsid {
    fn kind(&self) -> DetectorKind {
        DetectorKind::SimilarLookingSsid
    }

    fn detection_type(&self) -> DetectionType {
        DetectionType::Dot11MonitorSimilarLookingSsid
    }

    fn detect(
        &self,
        batch: &Dot11Batch,
        policy: &MonitoredSsid,
        _ctx: &DetectionContext<'_>,
    ) -> Result<Vec<DetectionEvent>, DetectorError> {
        let threshold = policy.similar_looking_ssid_threshold as usize;
        let mut candidates: BTreeMap<String, (Vec<&str>, i64)> = BTreeMap::new();
        for beacon in &batch.beacons {
            let ssid = sanitize_ssid(&beacon.ssid);
            if ssid.is_empty() || ssid == policy.ssid {
                continue;
            }
            let entry = candidates.entry(ssid).or_insert_with(|| (Vec::new(), 0));
            if !entry.0.contains(&beacon.bssid.as_str()) {
                entry.0.push(beacon.bssid.as_str());
            }
            entry.1 = entry.1.max(beacon.observed_at_ms);
        }

        let mut events = Vec::new();
        for (ssid, (bssids, observed_at_ms)) in candidates {
            let distance = ssid_distance(&ssid, &policy.ssid);
            if distance > threshold {
                continue;
            }
            events.push(policy_event(
                batch,
                policy,
                self.detection_type(),
                ssid.clone(),
                json!({
                    "monitored_ssid": policy.ssid,
                    "observed_ssid": ssid,
                    "distance": distance,
                    "threshold": threshold,
                    "bssids": bssids,
                }),
                observed_at_ms,
            ));
        }
        Ok(events)
    }
}
